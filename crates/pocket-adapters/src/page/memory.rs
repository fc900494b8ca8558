//! In-memory page adapter.

use parking_lot::RwLock;
use tracing::{debug, warn};
use url::Url;

use pocket_core::application::ports::{Location, Page};
use pocket_core::domain::{
    source_attr, Activatable, ClassElement, CloneMarker, LockState, NodeId, Pocket, TemplateRef,
    CLONE_CLASS, DATA_ATTR, SOURCE_ATTR, TEMPLATES_ATTR,
};

use super::dom::Dom;

/// Id of the section holding server-rendered `<template name>` elements.
pub const TEMPLATE_CONTAINER_ID: &str = "cr-data";

const DEFAULT_ORIGIN: &str = "http://localhost";
const HIDDEN_STYLE: &str = "display:none";

/// A page backed by a [`Dom`] and a location.
///
/// `NodeId::ROOT` is the document root; page-wide attribute-tier data lives
/// on it and is never serialised.
#[derive(Debug)]
pub struct MemoryPage {
    dom: RwLock<Dom>,
    location: RwLock<Location>,
}

impl MemoryPage {
    pub fn new(html: &str) -> Self {
        Self {
            dom: RwLock::new(Dom::parse(html)),
            location: RwLock::new(Location {
                origin: DEFAULT_ORIGIN.into(),
                pathname: "/".into(),
                ..Location::default()
            }),
        }
    }

    /// Set the page URL. Invalid URLs keep the previous location.
    pub fn with_url(self, url: &str) -> Self {
        match Url::parse(url) {
            Ok(parsed) => {
                *self.location.write() = Location {
                    origin: parsed.origin().ascii_serialization(),
                    pathname: parsed.path().to_string(),
                    search: parsed.query().map(|q| format!("?{q}")).unwrap_or_default(),
                    hash: parsed.fragment().map(|f| format!("#{f}")).unwrap_or_default(),
                };
            }
            Err(e) => warn!(url, error = %e, "ignoring invalid page URL"),
        }
        self
    }

    pub fn html(&self) -> String {
        self.dom.read().html()
    }

    pub fn url(&self) -> String {
        let loc = self.location.read();
        format!("{}{}{}{}", loc.origin, loc.pathname, loc.search, loc.hash)
    }

    pub fn find(&self, selector: &str) -> Option<NodeId> {
        self.dom.read().find(selector)
    }

    pub fn inner_html(&self, node: NodeId) -> String {
        self.dom.read().inner_html(node)
    }

    pub fn text_content(&self, node: NodeId) -> String {
        self.dom.read().text_content(node)
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.dom.read().attr(node, name).map(str::to_string)
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.dom.read().has_class(node, class)
    }

    pub fn is_visible(&self, node: NodeId) -> bool {
        !self
            .dom
            .read()
            .attr(node, "style")
            .is_some_and(|s| s.contains(HIDDEN_STYLE))
    }

    /// Elements carrying `class`, in document order.
    pub fn find_all_with_class(&self, class: &str) -> Vec<NodeId> {
        let dom = self.dom.read();
        dom.elements()
            .into_iter()
            .filter(|id| dom.has_class(*id, class))
            .collect()
    }
}

fn is_pocket(dom: &Dom, id: NodeId) -> bool {
    dom.has_class(id, LockState::OPEN_CLASS) || dom.has_class(id, LockState::LOCKED_CLASS)
}

fn data_key(key: &str) -> String {
    format!("data-{key}")
}

impl Page for MemoryPage {
    fn location(&self) -> Location {
        self.location.read().clone()
    }

    fn set_route_fragment(&self, fragment: &str) {
        let fragment = fragment.trim_start_matches('#');
        debug!(fragment, "route fragment updated");
        self.location.write().hash = if fragment.is_empty() {
            String::new()
        } else {
            format!("#{fragment}")
        };
    }

    fn preloaded_templates(&self) -> Vec<(String, String)> {
        let dom = self.dom.read();
        let Some(section) = dom.find(&format!("#{TEMPLATE_CONTAINER_ID}")) else {
            return Vec::new();
        };
        dom.descendants(section)
            .into_iter()
            .filter(|id| dom.tag(*id) == Some("template"))
            .filter_map(|id| {
                let name = dom.attr(id, "name")?.to_string();
                Some((name, dom.inner_html(id)))
            })
            .collect()
    }

    fn pockets(&self) -> Vec<Pocket> {
        let dom = self.dom.read();
        dom.elements()
            .into_iter()
            .filter(|id| is_pocket(&dom, *id))
            .map(|id| {
                let target = dom
                    .parent(id)
                    .map(|parent| match dom.attr(parent, "id") {
                        Some(pid) if !pid.is_empty() => format!("#{pid}"),
                        _ => dom.tag(parent).unwrap_or_default().to_string(),
                    })
                    .unwrap_or_default();
                let lock = if dom.has_class(id, LockState::LOCKED_CLASS) {
                    LockState::Locked
                } else {
                    LockState::Open
                };
                Pocket::new(id, target, TemplateRef::from_attributes(&dom.attributes(id)))
                    .with_lock(lock)
            })
            .collect()
    }

    fn insert_pocket(&self, target: &str, templates: &[TemplateRef]) -> Option<NodeId> {
        let mut dom = self.dom.write();
        let section = dom.find(target)?;

        let names: Vec<&str> = templates.iter().map(|t| t.name.as_str()).collect();
        let mut attrs = vec![
            ("class".to_string(), LockState::OPEN_CLASS.to_string()),
            (TEMPLATES_ATTR.to_string(), names.join(",")),
        ];
        for template in templates {
            if let Some(source) = &template.source {
                attrs.push((source_attr(&template.name), source.clone()));
            }
        }

        dom.clear_children(section);
        let pocket = dom.create_element("div", attrs);
        dom.append_child(section, pocket);
        Some(pocket)
    }

    fn set_inner_html(&self, node: NodeId, html: &str) {
        self.dom.write().set_inner_html(node, html);
    }

    fn append_html(&self, node: NodeId, html: &str) {
        self.dom.write().append_html(node, html);
    }

    fn set_visible(&self, node: NodeId, visible: bool) {
        let mut dom = self.dom.write();
        if !dom.contains(node) {
            return;
        }
        let style: Vec<String> = dom
            .attr(node, "style")
            .unwrap_or_default()
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty() && s.replace(' ', "") != HIDDEN_STYLE)
            .map(str::to_string)
            .collect();
        let mut style = style.join(";");
        if !visible {
            if !style.is_empty() {
                style.push(';');
            }
            style.push_str(HIDDEN_STYLE);
        }
        if style.is_empty() {
            dom.remove_attr(node, "style");
        } else {
            dom.set_attr(node, "style", &style);
        }
    }

    fn set_lock_state(&self, node: NodeId, state: LockState) {
        let mut dom = self.dom.write();
        dom.remove_class(node, LockState::OPEN_CLASS);
        dom.remove_class(node, LockState::LOCKED_CLASS);
        dom.add_class(node, state.css_class());
    }

    fn clones(&self) -> Vec<CloneMarker> {
        let dom = self.dom.read();
        dom.elements()
            .into_iter()
            .filter(|id| dom.has_class(*id, CLONE_CLASS))
            .filter_map(|id| {
                let data_ref = dom.attr(id, DATA_ATTR).filter(|d| !d.is_empty())?;
                let pocket = dom
                    .ancestors_or_self(id)
                    .into_iter()
                    .find(|a| is_pocket(&dom, *a));
                Some(CloneMarker {
                    id,
                    data_ref: data_ref.to_string(),
                    source: dom.attr(id, SOURCE_ATTR).map(str::to_string),
                    pocket,
                })
            })
            .collect()
    }

    fn contains_clone(&self, node: NodeId) -> bool {
        let dom = self.dom.read();
        dom.descendants(node)
            .into_iter()
            .any(|id| dom.has_class(id, CLONE_CLASS))
    }

    fn clone_fragment(&self, marker: NodeId, cloned_class: &str) -> Option<String> {
        let dom = self.dom.read();
        if !dom.is_element(marker) {
            return None;
        }
        // Work on a detached copy so the live marker stays intact.
        let mut scratch = Dom::parse(&dom.outer_html(marker));
        let copy = scratch.elements().into_iter().next()?;
        scratch.remove_class(copy, CLONE_CLASS);
        scratch.add_class(copy, cloned_class);
        for attr in ["id", DATA_ATTR, SOURCE_ATTR] {
            scratch.remove_attr(copy, attr);
        }
        Some(scratch.outer_html(copy))
    }

    fn insert_before(&self, node: NodeId, html: &str) -> Vec<NodeId> {
        self.dom.write().insert_before(node, html)
    }

    fn remove(&self, node: NodeId) {
        self.dom.write().remove(node);
    }

    fn contains(&self, node: NodeId) -> bool {
        self.dom.read().contains(node)
    }

    fn activatables(&self) -> Vec<Activatable> {
        let dom = self.dom.read();
        dom.elements()
            .into_iter()
            .filter(|id| dom.tag(*id) == Some("a"))
            .map(|id| Activatable {
                id,
                attributes: dom.attributes(id),
            })
            .collect()
    }

    fn elements_with_class_prefix(&self, prefix: &str) -> Vec<ClassElement> {
        let dom = self.dom.read();
        dom.elements()
            .into_iter()
            .filter_map(|id| {
                let classes = dom.classes(id);
                if !classes.iter().any(|c| c.starts_with(prefix)) {
                    return None;
                }
                Some(ClassElement {
                    id,
                    tag: dom.tag(id).unwrap_or_default().to_string(),
                    classes,
                    inner_html: dom.inner_html(id),
                    attributes: dom.attributes(id),
                })
            })
            .collect()
    }

    /// Form controls keep their value in the `value` attribute.
    fn set_value(&self, node: NodeId, value: &str) {
        let mut dom = self.dom.write();
        dom.set_attr(node, "value", value);
        if dom.tag(node) == Some("textarea") {
            dom.set_inner_html(node, value);
        }
    }

    fn remove_class(&self, node: NodeId, class: &str) {
        self.dom.write().remove_class(node, class);
    }

    fn closest_with_class_prefix(&self, node: NodeId, prefix: &str) -> Option<NodeId> {
        let dom = self.dom.read();
        dom.ancestors_or_self(node)
            .into_iter()
            .find(|id| dom.classes(*id).iter().any(|c| c.starts_with(prefix)))
    }

    fn data_attribute(&self, node: NodeId, key: &str) -> Option<String> {
        self.dom.read().attr(node, &data_key(key)).map(str::to_string)
    }

    fn set_data_attribute(&self, node: NodeId, key: &str, value: &str) {
        self.dom.write().set_attr(node, &data_key(key), value);
    }

    fn remove_data_attribute(&self, node: NodeId, key: &str) {
        self.dom.write().remove_attr(node, &data_key(key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_splits_the_url() {
        let page = MemoryPage::new("").with_url("https://example.com:8443/app?x=1#frag");
        let loc = page.location();
        assert_eq!(loc.origin, "https://example.com:8443");
        assert_eq!(loc.pathname, "/app");
        assert_eq!(loc.search, "?x=1");
        assert_eq!(loc.hash, "#frag");

        page.set_route_fragment("#next");
        assert_eq!(page.location().hash, "#next");
    }

    #[test]
    fn preloaded_templates_come_from_the_container() {
        let page = MemoryPage::new(
            r#"<section id="cr-data"><template name="ROW"><li>{{data:x}}</li></template></section>
               <template name="OUTSIDE">no</template>"#,
        );
        assert_eq!(
            page.preloaded_templates(),
            vec![("ROW".to_string(), "<li>{{data:x}}</li>".to_string())]
        );
    }

    #[test]
    fn insert_pocket_replaces_target_children() {
        let page = MemoryPage::new(r#"<main id="main"><p>old</p></main>"#);
        let refs = vec![TemplateRef::new("A"), TemplateRef::new("B").with_source("/b.html")];
        let pocket = page.insert_pocket("#main", &refs).unwrap();

        let pockets = page.pockets();
        assert_eq!(pockets.len(), 1);
        assert_eq!(pockets[0].id, pocket);
        assert_eq!(pockets[0].target, "#main");
        assert_eq!(pockets[0].templates, refs);
        assert!(!page.html().contains("old"));
        assert!(page.insert_pocket("#nowhere", &refs).is_none());
    }

    #[test]
    fn visibility_is_a_style_toggle() {
        let page = MemoryPage::new(r#"<div id="d" style="color:red"></div>"#);
        let d = page.find("#d").unwrap();
        page.set_visible(d, false);
        assert!(!page.is_visible(d));
        assert_eq!(page.attribute(d, "style").as_deref(), Some("color:red;display:none"));
        page.set_visible(d, true);
        assert!(page.is_visible(d));
        assert_eq!(page.attribute(d, "style").as_deref(), Some("color:red"));
    }

    #[test]
    fn clone_fragment_strips_marker_attributes() {
        let page = MemoryPage::new(
            r#"<div class="core-pocket"><ul><li id="c" class="core-clone row" data-core-data="user-list" data-core-source="/u.json">{{rec:name}}</li></ul></div>"#,
        );
        let markers = page.clones();
        assert_eq!(markers.len(), 1);
        let marker = &markers[0];
        assert_eq!(marker.data_ref, "user-list");
        assert_eq!(marker.source.as_deref(), Some("/u.json"));
        assert!(marker.pocket.is_some());

        let fragment = page.clone_fragment(marker.id, &marker.cloned_class()).unwrap();
        assert_eq!(fragment, r#"<li class="row core-cloned-user-list">{{rec:name}}</li>"#);
        assert!(page.contains_clone(marker.pocket.unwrap()));
    }

    #[test]
    fn lock_state_swaps_classes() {
        let page = MemoryPage::new(r#"<div id="p" class="core-pocket x"></div>"#);
        let p = page.find("#p").unwrap();
        page.set_lock_state(p, LockState::Locked);
        assert!(page.has_class(p, "core-pocketed"));
        assert!(!page.has_class(p, "core-pocket"));
        assert_eq!(page.pockets()[0].lock, LockState::Locked);
    }

    #[test]
    fn data_attributes_live_on_the_node() {
        let page = MemoryPage::new(r#"<div id="d"></div>"#);
        let d = page.find("#d").unwrap();
        page.set_data_attribute(d, "user", r#"{"a":1}"#);
        assert_eq!(page.data_attribute(d, "user").as_deref(), Some(r#"{"a":1}"#));
        page.remove_data_attribute(d, "user");
        assert_eq!(page.data_attribute(d, "user"), None);

        page.set_data_attribute(NodeId::ROOT, "site", "1");
        assert!(!page.html().contains("data-site"));
    }
}
