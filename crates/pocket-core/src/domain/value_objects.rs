//! Domain value objects: EntryKind, StorageTier, LockState, NodeId and the
//! fetch policy enums.
//!
//! # Design
//!
//! These are pure value types: `Copy` with equality by value.
//! This file's only job is to define the types, their string
//! representations, and their `FromStr` parsers.

use crate::domain::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── EntryKind ────────────────────────────────────────────────────────────────

/// The namespace a cached entry lives in.
///
/// A DATA entry and a TEMPLATE entry may share a key without colliding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Data,
    Template,
}

impl EntryKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Template => "template",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "data" => Ok(Self::Data),
            "template" | "tpl" => Ok(Self::Template),
            other => Err(DomainError::UnknownEntryKind(other.to_string())),
        }
    }
}

// ── StorageTier ──────────────────────────────────────────────────────────────

/// Where the Store keeps a data value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageTier {
    /// Attached to a scope node, lost with it.
    Ephemeral,
    /// Serialised into the scope's attribute set.
    #[default]
    Attribute,
    /// Serialised into the session storage port.
    Session,
}

impl StorageTier {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ephemeral => "ephemeral",
            Self::Attribute => "attribute",
            Self::Session => "session",
        }
    }

    /// Numeric storage id used by page markup (`0`, `1`, `2`).
    pub const fn index(&self) -> u8 {
        match self {
            Self::Ephemeral => 0,
            Self::Attribute => 1,
            Self::Session => 2,
        }
    }

    pub fn from_index(index: u8) -> Result<Self, DomainError> {
        match index {
            0 => Ok(Self::Ephemeral),
            1 => Ok(Self::Attribute),
            2 => Ok(Self::Session),
            other => Err(DomainError::InvalidStorageTier(other.to_string())),
        }
    }
}

impl fmt::Display for StorageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageTier {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "0" | "ephemeral" | "memory" => Ok(Self::Ephemeral),
            "1" | "attribute" | "dataset" => Ok(Self::Attribute),
            "2" | "session" => Ok(Self::Session),
            other => Err(DomainError::InvalidStorageTier(other.to_string())),
        }
    }
}

// ── LockState ────────────────────────────────────────────────────────────────

/// Render state of a pocket.
///
/// The CSS class on the page element is a projection of this value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockState {
    #[default]
    Open,
    Locked,
}

impl LockState {
    pub const OPEN_CLASS: &'static str = "core-pocket";
    pub const LOCKED_CLASS: &'static str = "core-pocketed";

    pub const fn css_class(&self) -> &'static str {
        match self {
            Self::Open => Self::OPEN_CLASS,
            Self::Locked => Self::LOCKED_CLASS,
        }
    }

    /// Recover the state from a page class list.
    pub fn from_classes<'a>(classes: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        let mut found = None;
        for class in classes {
            match class {
                Self::LOCKED_CLASS => return Some(Self::Locked),
                Self::OPEN_CLASS => found = Some(Self::Open),
                _ => {}
            }
        }
        found
    }

    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.css_class())
    }
}

// ── NodeId ───────────────────────────────────────────────────────────────────

/// Opaque handle to a page node, issued by the `Page` adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    /// The section node that owns page-wide data and the template container.
    pub const ROOT: NodeId = NodeId(0);
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

// ── Fetch policies ───────────────────────────────────────────────────────────

/// HTTP method of a fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other => Err(DomainError::UnsupportedMethod(other.to_string())),
        }
    }
}

/// Cache policy forwarded to the fetcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CachePolicy {
    Default,
    #[default]
    NoCache,
    Reload,
    ForceCache,
    OnlyIfCached,
}

impl CachePolicy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::NoCache => "no-cache",
            Self::Reload => "reload",
            Self::ForceCache => "force-cache",
            Self::OnlyIfCached => "only-if-cached",
        }
    }
}

/// Redirect policy forwarded to the fetcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectPolicy {
    #[default]
    Follow,
    Manual,
    Error,
}

impl RedirectPolicy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Follow => "follow",
            Self::Manual => "manual",
            Self::Error => "error",
        }
    }
}
