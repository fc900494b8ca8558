//! Page region descriptors: pockets, clone markers and click triggers.
//!
//! ## Attribute grammar
//!
//! ```text
//! <div class="core-pocket"
//!      data-core-templates="HEADER,ITEM"         required templates, comma list
//!      data-ITEM-core-source="/t/item.html">     per-template fetch URL
//!
//!   <div class="core-clone"
//!        data-core-data="items"                  data key holding the records
//!        data-core-source="/items.json">         optional fetch URL
//!
//! <a data-core-templates="ITEM"                  click trigger
//!    data-ITEM-core-source="/t/item.html"
//!    target="#main">
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{
    common::alpha_only,
    error::DomainError,
    value_objects::{LockState, NodeId},
};

/// Attribute listing a pocket's (or trigger's) required templates.
pub const TEMPLATES_ATTR: &str = "data-core-templates";
/// Attribute naming the data key of a clone marker (or a data trigger).
pub const DATA_ATTR: &str = "data-core-data";
/// Attribute giving a clone's (or trigger's) single fetch URL.
pub const SOURCE_ATTR: &str = "data-core-source";
/// Class marking an unexpanded clone.
pub const CLONE_CLASS: &str = "core-clone";
/// Prefix of the class given to expanded clone copies.
pub const CLONED_CLASS_PREFIX: &str = "core-cloned-";
/// Template name that never needs fetching.
pub const EMPTY_TEMPLATE: &str = "EMPTY";
/// Template painted while a pocket waits on fetches.
pub const LOADING_TEMPLATE: &str = "LOADING";

/// Attribute carrying the fetch URL for template `name`.
///
/// Attribute names are ASCII case-insensitive and parsed pages hold them in
/// lower case, so the name is folded.
pub fn source_attr(name: &str) -> String {
    format!("data-{}-core-source", name.to_ascii_lowercase())
}

/// Split a comma-delimited template list, trimming and dropping blanks.
pub fn parse_template_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// A required template with its optional fetch URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRef {
    #[serde(rename = "n")]
    pub name: String,
    #[serde(rename = "u", default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl TemplateRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Build refs from a template list attribute plus an attribute lookup
    /// for each `data-<name>-core-source`.
    pub fn from_attributes(attributes: &BTreeMap<String, String>) -> Vec<Self> {
        let list = attributes.get(TEMPLATES_ATTR).map(String::as_str).unwrap_or("");
        parse_template_list(list)
            .into_iter()
            .map(|name| {
                let source = attributes.get(&source_attr(&name)).cloned();
                Self { name, source }
            })
            .collect()
    }

    pub fn is_empty_template(&self) -> bool {
        self.name == EMPTY_TEMPLATE
    }
}

/// A page region declaring the templates it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pocket {
    pub id: NodeId,
    /// Selector of the parent region (`#id`), used when persisting directives.
    pub target: String,
    pub templates: Vec<TemplateRef>,
    pub lock: LockState,
}

impl Pocket {
    pub fn new(id: NodeId, target: impl Into<String>, templates: Vec<TemplateRef>) -> Self {
        Self {
            id,
            target: target.into(),
            templates,
            lock: LockState::Open,
        }
    }

    pub fn with_lock(mut self, lock: LockState) -> Self {
        self.lock = lock;
        self
    }

    /// Template names in declaration order.
    pub fn template_names(&self) -> impl Iterator<Item = &str> {
        self.templates.iter().map(|t| t.name.as_str())
    }

    /// Open pockets are scanned every cycle; locked ones are left alone.
    pub fn is_open(&self) -> bool {
        self.lock.is_open()
    }
}

/// A marker that expands into one fragment per record of `data_ref`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneMarker {
    pub id: NodeId,
    pub data_ref: String,
    pub source: Option<String>,
    /// Closest enclosing pocket, open or locked.
    pub pocket: Option<NodeId>,
}

impl CloneMarker {
    /// Class given to the expanded copies, e.g. `core-cloned-user-list`.
    pub fn cloned_class(&self) -> String {
        let suffix = self
            .data_ref
            .split('-')
            .map(alpha_only)
            .collect::<Vec<_>>()
            .join("-");
        format!("{CLONED_CLASS_PREFIX}{suffix}")
    }
}

/// An element the page reports as activatable (anchors and the like).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activatable {
    pub id: NodeId,
    pub attributes: BTreeMap<String, String>,
}

/// What happens when an activatable element is clicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub node: NodeId,
    /// Where the new pocket goes: `#id`, `.class` or a tag name.
    pub target: String,
    pub templates: Vec<TemplateRef>,
}

impl Trigger {
    /// Read a trigger from element attributes.
    ///
    /// Templates come from `data-core-templates`, else `data-core-data`.
    /// Each name takes its source from `data-<name>-core-source`, falling
    /// back to `data-core-source`.
    pub fn from_element(element: &Activatable, default_target: &str) -> Result<Self, DomainError> {
        let attrs = &element.attributes;
        let list = attrs
            .get(TEMPLATES_ATTR)
            .or_else(|| attrs.get(DATA_ATTR))
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| DomainError::InvalidTrigger {
                node: element.id.to_string(),
                reason: "no template or data list".into(),
            })?;

        let fallback = attrs.get(SOURCE_ATTR);
        let templates = parse_template_list(list)
            .into_iter()
            .map(|name| {
                let source = attrs.get(&source_attr(&name)).or(fallback).cloned();
                TemplateRef { name, source }
            })
            .collect();

        let target = attrs
            .get("target")
            .filter(|t| !t.is_empty())
            .cloned()
            .unwrap_or_else(|| default_target.to_string());

        Ok(Self {
            node: element.id,
            target,
            templates,
        })
    }
}

/// A page element carrying `h-` or `f-` class directives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassElement {
    pub id: NodeId,
    /// Lower-case tag name.
    pub tag: String,
    pub classes: Vec<String>,
    pub inner_html: String,
    pub attributes: BTreeMap<String, String>,
}

impl ClassElement {
    /// Form controls receive a value instead of inner HTML.
    pub fn is_form_control(&self) -> bool {
        matches!(self.tag.as_str(), "input" | "select" | "textarea")
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}
