//! Driven (output) ports - implemented by infrastructure.
//!
//! These traits define what the render lifecycle needs from its host. The
//! `pocket-adapters` crate provides implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::application::error::ApplicationResult;
use crate::domain::{
    Activatable, ClassElement, CloneMarker, FetchRequest, FetchResponse, LockState, NodeId, Pocket,
    TemplateRef,
};

/// Port for network fetches.
///
/// Implemented by:
/// - `pocket_adapters::fetcher::HttpFetcher` (reqwest)
/// - `pocket_adapters::fetcher::FileFetcher` (local directory)
/// - `pocket_adapters::fetcher::StubFetcher` (testing)
///
/// A returned `Err` is a transport failure. Non-2xx statuses come back as
/// `Ok` and are turned into failure values by the cache ledger.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> ApplicationResult<FetchResponse>;
}

/// URL parts of the current page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    /// Scheme, host and port, e.g. `https://example.com`.
    pub origin: String,
    pub pathname: String,
    pub search: String,
    /// Fragment including the leading `#`, or empty.
    pub hash: String,
}

/// Port for the page document.
///
/// Nodes are addressed by [`NodeId`] handles issued by the adapter. Every
/// method takes `&self`; adapters use interior mutability. Operations on a
/// node that no longer exists are no-ops.
///
/// Implemented by:
/// - `pocket_adapters::page::MemoryPage` (HTML fragment DOM)
pub trait Page: Send + Sync {
    /// Current location.
    fn location(&self) -> Location;

    /// Replace the URL fragment. `fragment` includes the leading `#`.
    fn set_route_fragment(&self, fragment: &str);

    /// `(name, html)` pairs found in the page's template container.
    fn preloaded_templates(&self) -> Vec<(String, String)>;

    /// Every pocket in document order, open or locked.
    fn pockets(&self) -> Vec<Pocket>;

    /// Empty the element matched by `target` (`#id`, `.class` or a tag name)
    /// and append a new open pocket requiring `templates`.
    fn insert_pocket(&self, target: &str, templates: &[TemplateRef]) -> Option<NodeId>;

    fn set_inner_html(&self, node: NodeId, html: &str);

    fn append_html(&self, node: NodeId, html: &str);

    fn set_visible(&self, node: NodeId, visible: bool);

    /// Project a lock state onto the node's class list.
    fn set_lock_state(&self, node: NodeId, state: LockState);

    /// Every unexpanded clone marker in document order.
    fn clones(&self) -> Vec<CloneMarker>;

    /// Whether `node` has an unexpanded clone marker among its descendants.
    fn contains_clone(&self, node: NodeId) -> bool;

    /// Outer HTML of a clone marker prepared for expansion: `core-clone`
    /// swapped for `cloned_class`, and the `id`, data key and source
    /// attributes removed.
    fn clone_fragment(&self, marker: NodeId, cloned_class: &str) -> Option<String>;

    /// Parse `html` and insert it before `node`, returning the new
    /// top-level element handles in order.
    fn insert_before(&self, node: NodeId, html: &str) -> Vec<NodeId>;

    fn remove(&self, node: NodeId);

    /// Whether `node` is still part of the page. Handles are never reissued
    /// for a different node.
    fn contains(&self, node: NodeId) -> bool;

    /// Elements that can act as click triggers.
    fn activatables(&self) -> Vec<Activatable>;

    /// Elements with at least one class starting with `prefix`.
    fn elements_with_class_prefix(&self, prefix: &str) -> Vec<ClassElement>;

    /// Set the value of a form control.
    fn set_value(&self, node: NodeId, value: &str);

    fn remove_class(&self, node: NodeId, class: &str);

    /// Nearest ancestor-or-self with a class starting with `prefix`.
    fn closest_with_class_prefix(&self, node: NodeId, prefix: &str) -> Option<NodeId>;

    /// Read a `data-*` attribute used as the attribute storage tier.
    fn data_attribute(&self, node: NodeId, key: &str) -> Option<String>;

    fn set_data_attribute(&self, node: NodeId, key: &str, value: &str);

    fn remove_data_attribute(&self, node: NodeId, key: &str);
}

/// Port for the session storage tier.
///
/// Implemented by:
/// - `pocket_adapters::session::MemorySession`
/// - `pocket_adapters::session::FileSession` (JSON file)
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> ApplicationResult<()>;

    fn remove(&self, key: &str);
}

/// Port for wall-clock time.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Port for named value transforms.
///
/// Implemented by:
/// - `pocket_adapters::formatter::BuiltinFormatter`
///
/// Unknown format names return the value unchanged.
pub trait ValueFormatter: Send + Sync {
    fn format(&self, value: &Value, format: &str, clue: Option<&str>) -> Value;
}
