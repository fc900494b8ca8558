//! A small HTML fragment tree.
//!
//! Markup is tokenized by `html5gum` and assembled into an arena of
//! elements and text. Comments and doctypes are dropped. `script`, `style`
//! and `template` hold their content as one raw text node, so placeholders
//! inside a template survive parsing untouched. Other text and attribute
//! values are entity-decoded on parse and re-escaped on output. Attribute
//! names are folded to lower case, as a browser does.
//!
//! Freed slots are reused. A [`NodeId`] carries the slot's generation in its
//! upper half, so a handle to a removed node never resolves to its
//! successor.

use std::collections::BTreeMap;

use html5gum::{State, Token, Tokenizer};

use pocket_core::domain::NodeId;

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Content is kept as written and never re-escaped.
const RAW_TEXT_TAGS: &[&str] = &["script", "style", "template"];

const ROOT_TAG: &str = "#root";

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeData {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

fn node_id(index: u32, generation: u32) -> NodeId {
    NodeId((u64::from(generation) << 32) | u64::from(index))
}

fn split_id(id: NodeId) -> (usize, u32) {
    ((id.0 & u64::from(u32::MAX)) as usize, (id.0 >> 32) as u32)
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Arena of nodes addressed by [`NodeId`]. Slot 0 is the document root.
#[derive(Debug, Clone)]
pub struct Dom {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    pub fn new() -> Self {
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(Node {
                    parent: None,
                    children: Vec::new(),
                    data: NodeData::Element {
                        tag: ROOT_TAG.into(),
                        attrs: Vec::new(),
                    },
                }),
            }],
            free: Vec::new(),
        }
    }

    pub fn parse(html: &str) -> Self {
        let mut dom = Self::new();
        dom.append_html(NodeId::ROOT, html);
        dom
    }

    // ── Access ──────────────────────────────────────────────────────────────

    fn node(&self, id: NodeId) -> Option<&Node> {
        let (index, generation) = split_id(id);
        self.slots
            .get(index)
            .filter(|slot| slot.generation == generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let (index, generation) = split_id(id);
        self.slots
            .get_mut(index)
            .filter(|slot| slot.generation == generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.node(id).map(|n| &n.data), Some(NodeData::Element { .. }))
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.node(id)?.data {
            NodeData::Element { tag, .. } => Some(tag),
            NodeData::Text(_) => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id).map(|n| n.children.clone()).unwrap_or_default()
    }

    /// Descendants of `id` in document order, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            if let Some(node) = self.node(next) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Every element in document order.
    pub fn elements(&self) -> Vec<NodeId> {
        self.descendants(NodeId::ROOT)
            .into_iter()
            .filter(|id| self.is_element(*id))
            .collect()
    }

    /// `id` and its ancestors, nearest first.
    pub fn ancestors_or_self(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.contains(id).then_some(id);
        while let Some(node) = current {
            out.push(node);
            current = self.parent(node);
        }
        out
    }

    // ── Attributes ──────────────────────────────────────────────────────────

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.node(id)?.data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str()),
            NodeData::Text(_) => None,
        }
    }

    pub fn attributes(&self, id: NodeId) -> BTreeMap<String, String> {
        match self.node(id).map(|n| &n.data) {
            Some(NodeData::Element { attrs, .. }) => attrs.iter().cloned().collect(),
            _ => BTreeMap::new(),
        }
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(NodeData::Element { attrs, .. }) = self.node_mut(id).map(|n| &mut n.data) {
            match attrs.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
                Some((_, v)) => *v = value.to_string(),
                None => attrs.push((name.to_ascii_lowercase(), value.to_string())),
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(NodeData::Element { attrs, .. }) = self.node_mut(id).map(|n| &mut n.data) {
            attrs.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        }
    }

    pub fn classes(&self, id: NodeId) -> Vec<String> {
        self.attr(id, "class")
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|c| c.split_whitespace().any(|k| k == class))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) {
            return;
        }
        let mut classes = self.classes(id);
        classes.push(class.to_string());
        self.set_attr(id, "class", &classes.join(" "));
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if !self.has_class(id, class) {
            return;
        }
        let classes: Vec<String> = self.classes(id).into_iter().filter(|c| c != class).collect();
        self.set_attr(id, "class", &classes.join(" "));
    }

    // ── Lookup ──────────────────────────────────────────────────────────────

    /// First element matching `#id`, `.class` or a tag name.
    pub fn find(&self, selector: &str) -> Option<NodeId> {
        let selector = selector.trim();
        self.elements().into_iter().find(|id| {
            if let Some(wanted) = selector.strip_prefix('#') {
                self.attr(*id, "id") == Some(wanted)
            } else if let Some(wanted) = selector.strip_prefix('.') {
                self.has_class(*id, wanted)
            } else {
                self.tag(*id)
                    .is_some_and(|t| t.eq_ignore_ascii_case(selector))
            }
        })
    }

    // ── Serialisation ───────────────────────────────────────────────────────

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.write_node(child, &mut out);
        }
        out
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    pub fn text_content(&self, id: NodeId) -> String {
        match self.node(id).map(|n| &n.data) {
            Some(NodeData::Text(t)) => t.clone(),
            Some(NodeData::Element { .. }) => self
                .children(id)
                .into_iter()
                .map(|c| self.text_content(c))
                .collect(),
            None => String::new(),
        }
    }

    /// The whole document.
    pub fn html(&self) -> String {
        self.inner_html(NodeId::ROOT)
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        match &node.data {
            NodeData::Text(text) if self.holds_raw_text(node.parent) => out.push_str(text),
            NodeData::Text(text) => out.push_str(&escape_text(text)),
            NodeData::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                out.push('>');
                if VOID_TAGS.contains(&tag.as_str()) {
                    return;
                }
                for child in &node.children {
                    self.write_node(*child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }

    fn holds_raw_text(&self, parent: Option<NodeId>) -> bool {
        parent
            .and_then(|p| self.tag(p))
            .is_some_and(|t| RAW_TEXT_TAGS.contains(&t))
    }

    // ── Mutation ────────────────────────────────────────────────────────────

    fn create(&mut self, data: NodeData) -> NodeId {
        let node = Node {
            parent: None,
            children: Vec::new(),
            data,
        };
        while let Some(index) = self.free.pop() {
            if let Some(slot) = self.slots.get_mut(index as usize) {
                slot.node = Some(node);
                return node_id(index, slot.generation);
            }
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        node_id(index, 0)
    }

    pub fn create_element(&mut self, tag: &str, attrs: Vec<(String, String)>) -> NodeId {
        self.create(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            attrs,
        })
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if !self.contains(parent) {
            return;
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }
    }

    /// Drop every child of `id`.
    pub fn clear_children(&mut self, id: NodeId) {
        for child in self.children(id) {
            self.remove(child);
        }
    }

    /// Detach `id` and free its subtree. The root cannot be removed.
    pub fn remove(&mut self, id: NodeId) {
        if id == NodeId::ROOT || !self.contains(id) {
            return;
        }
        if let Some(parent) = self.parent(id) {
            if let Some(node) = self.node_mut(parent) {
                node.children.retain(|c| *c != id);
            }
        }
        for gone in self.descendants(id).into_iter().chain(std::iter::once(id)) {
            let (index, _) = split_id(gone);
            if let Some(slot) = self.slots.get_mut(index) {
                slot.node = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
            }
        }
    }

    pub fn set_inner_html(&mut self, id: NodeId, html: &str) {
        if !self.contains(id) {
            return;
        }
        self.clear_children(id);
        self.append_html(id, html);
    }

    /// Parse `html` and append it to `id`. Returns the new top-level nodes.
    pub fn append_html(&mut self, id: NodeId, html: &str) -> Vec<NodeId> {
        if !self.contains(id) {
            return Vec::new();
        }
        let text_only = self
            .tag(id)
            .is_some_and(|t| RAW_TEXT_TAGS.contains(&t) || t == "textarea");
        let top = if text_only {
            vec![self.create(NodeData::Text(html.to_string()))]
        } else {
            self.parse_fragment(html)
        };
        for node in &top {
            self.append_child(id, *node);
        }
        top
    }

    /// Parse `html` and insert it before `id`. Returns the new top-level
    /// element handles.
    pub fn insert_before(&mut self, id: NodeId, html: &str) -> Vec<NodeId> {
        let Some(parent) = self.parent(id) else {
            return Vec::new();
        };
        let top = self.parse_fragment(html);
        for node in &top {
            if let Some(n) = self.node_mut(*node) {
                n.parent = Some(parent);
            }
        }
        if let Some(p) = self.node_mut(parent) {
            let at = p.children.iter().position(|c| *c == id).unwrap_or(p.children.len());
            p.children.splice(at..at, top.iter().copied());
        }
        top.into_iter().filter(|n| self.is_element(*n)).collect()
    }

    // ── Parsing ─────────────────────────────────────────────────────────────

    /// Parse into detached nodes, returning the top-level ones.
    fn parse_fragment(&mut self, html: &str) -> Vec<NodeId> {
        let mut top = Vec::new();
        let mut open: Vec<NodeId> = Vec::new();
        let mut tokenizer = Tokenizer::new(html);

        while let Some(Ok(token)) = tokenizer.next() {
            match token {
                Token::StartTag(tag) => {
                    let name = lossy(&tag.name).to_ascii_lowercase();
                    let attrs = tag
                        .attributes
                        .iter()
                        .map(|(k, v)| (lossy(k).to_ascii_lowercase(), lossy(v)))
                        .collect();
                    let id = self.create(NodeData::Element {
                        tag: name.clone(),
                        attrs,
                    });
                    self.attach_parsed(id, open.last().copied(), &mut top);

                    if tag.self_closing || VOID_TAGS.contains(&name.as_str()) {
                        continue;
                    }
                    match name.as_str() {
                        "script" | "style" => tokenizer.set_state(State::ScriptData),
                        "template" => tokenizer.set_state(State::RawText),
                        "textarea" | "title" => tokenizer.set_state(State::RcData),
                        _ => {}
                    }
                    open.push(id);
                }
                Token::EndTag(tag) => {
                    let name = lossy(&tag.name).to_ascii_lowercase();
                    if let Some(pos) = open.iter().rposition(|id| self.tag(*id) == Some(name.as_str())) {
                        open.truncate(pos);
                    }
                }
                Token::String(text) => {
                    let text = lossy(&text);
                    self.push_text(&text, open.last().copied(), &mut top);
                }
                Token::Doctype(_) | Token::Comment(_) | Token::Error(_) => {}
            }
        }
        top
    }

    /// Append text to `parent`, merging with a trailing text node.
    fn push_text(&mut self, text: &str, parent: Option<NodeId>, top: &mut Vec<NodeId>) {
        if text.is_empty() {
            return;
        }
        let last = match parent {
            Some(p) => self.node(p).and_then(|n| n.children.last().copied()),
            None => top.last().copied(),
        };
        if let Some(NodeData::Text(existing)) = last.and_then(|l| self.node_mut(l)).map(|n| &mut n.data) {
            existing.push_str(text);
            return;
        }
        let id = self.create(NodeData::Text(text.to_string()));
        self.attach_parsed(id, parent, top);
    }

    fn attach_parsed(&mut self, id: NodeId, parent: Option<NodeId>, top: &mut Vec<NodeId>) {
        match parent {
            Some(parent) => self.append_child(parent, id),
            None => top.push(id),
        }
    }
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
