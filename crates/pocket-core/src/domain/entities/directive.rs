//! Route-persisted render state.
//!
//! A directive lists every pocket rendered in a cycle so that a reload or a
//! shared link can rebuild the same regions. It travels in the URL fragment as
//! percent-encoded JSON using short field names:
//!
//! ```text
//! [{"t":"#main","l":[{"n":"ITEM","u":"/t.html"},{"n":"EMPTY"}]}]
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::{
    entities::pocket::{Pocket, TemplateRef},
    error::DomainError,
};

/// One rendered pocket: where it lives and what it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectiveEntry {
    #[serde(rename = "t")]
    pub target: String,
    #[serde(rename = "l")]
    pub templates: Vec<TemplateRef>,
}

impl DirectiveEntry {
    pub fn new(target: impl Into<String>, templates: Vec<TemplateRef>) -> Self {
        Self {
            target: target.into(),
            templates,
        }
    }

    /// Comma-joined template names, as written to a pocket attribute.
    pub fn template_list(&self) -> String {
        self.templates
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl From<&Pocket> for DirectiveEntry {
    fn from(pocket: &Pocket) -> Self {
        Self::new(pocket.target.clone(), pocket.templates.clone())
    }
}

/// Ordered list of rendered pockets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Directive(Vec<DirectiveEntry>);

impl Directive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: DirectiveEntry) {
        self.0.push(entry);
    }

    pub fn entries(&self) -> &[DirectiveEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether a fragment carries the encoded `"t"`, `"l"` and `"n"` fields.
    pub fn looks_like_fragment(fragment: &str) -> bool {
        ["\"t\"", "\"l\"", "\"n\""]
            .iter()
            .all(|field| fragment.contains(urlencoding::encode(field).as_ref()))
    }

    /// Encode as a URL fragment, including the leading `#`.
    pub fn to_fragment(&self) -> Result<String, DomainError> {
        let json = serde_json::to_string(&self.0)
            .map_err(|e| DomainError::InvalidDirective(e.to_string()))?;
        Ok(format!("#{}", urlencoding::encode(&json)))
    }

    /// Decode a URL fragment (with or without the leading `#`).
    pub fn from_fragment(fragment: &str) -> Result<Self, DomainError> {
        let trimmed = fragment.replace('#', "");
        if !Self::looks_like_fragment(&trimmed) {
            return Err(DomainError::InvalidDirective(
                "fragment is missing directive fields".into(),
            ));
        }
        let json = urlencoding::decode(&trimmed)
            .map_err(|e| DomainError::InvalidDirective(e.to_string()))?;
        let entries: Vec<DirectiveEntry> = serde_json::from_str(&json)
            .map_err(|e| DomainError::InvalidDirective(e.to_string()))?;
        Ok(Self(entries))
    }
}

impl FromIterator<DirectiveEntry> for Directive {
    fn from_iter<I: IntoIterator<Item = DirectiveEntry>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Directive {
    type Item = DirectiveEntry;
    type IntoIter = std::vec::IntoIter<DirectiveEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
