//! In-crate test doubles for the ports.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde_json::Value;

use crate::application::error::ApplicationResult;
use crate::application::hooks::Hooks;
use crate::application::ports::{Clock, Location, Page, SessionStorage, ValueFormatter};
use crate::application::services::formatting::Formatting;
use crate::application::services::store::Store;
use crate::application::settings::Settings;
use crate::domain::{
    Activatable, ClassElement, CloneMarker, LockState, NodeId, Pocket, TemplateRef,
};

/// A page with no elements that still keeps `data-*` attributes and
/// remembers which handles were removed.
#[derive(Default)]
pub struct NullPage {
    attributes: Mutex<HashMap<(NodeId, String), String>>,
    removed: Mutex<HashSet<NodeId>>,
}

impl NullPage {
    pub fn attribute(&self, node: NodeId, key: &str) -> Option<String> {
        self.attributes.lock().get(&(node, key.to_string())).cloned()
    }
}

impl Page for NullPage {
    fn location(&self) -> Location {
        Location {
            origin: "http://localhost".into(),
            pathname: "/".into(),
            ..Location::default()
        }
    }
    fn set_route_fragment(&self, _fragment: &str) {}
    fn preloaded_templates(&self) -> Vec<(String, String)> {
        Vec::new()
    }
    fn pockets(&self) -> Vec<Pocket> {
        Vec::new()
    }
    fn insert_pocket(&self, _target: &str, _templates: &[TemplateRef]) -> Option<NodeId> {
        None
    }
    fn set_inner_html(&self, _node: NodeId, _html: &str) {}
    fn append_html(&self, _node: NodeId, _html: &str) {}
    fn set_visible(&self, _node: NodeId, _visible: bool) {}
    fn set_lock_state(&self, _node: NodeId, _state: LockState) {}
    fn clones(&self) -> Vec<CloneMarker> {
        Vec::new()
    }
    fn contains_clone(&self, _node: NodeId) -> bool {
        false
    }
    fn clone_fragment(&self, _marker: NodeId, _cloned_class: &str) -> Option<String> {
        None
    }
    fn insert_before(&self, _node: NodeId, _html: &str) -> Vec<NodeId> {
        Vec::new()
    }
    fn remove(&self, node: NodeId) {
        self.removed.lock().insert(node);
    }
    fn contains(&self, node: NodeId) -> bool {
        !self.removed.lock().contains(&node)
    }
    fn activatables(&self) -> Vec<Activatable> {
        Vec::new()
    }
    fn elements_with_class_prefix(&self, _prefix: &str) -> Vec<ClassElement> {
        Vec::new()
    }
    fn set_value(&self, _node: NodeId, _value: &str) {}
    fn remove_class(&self, _node: NodeId, _class: &str) {}
    fn closest_with_class_prefix(&self, _node: NodeId, _prefix: &str) -> Option<NodeId> {
        None
    }
    fn data_attribute(&self, node: NodeId, key: &str) -> Option<String> {
        self.attribute(node, key)
    }
    fn set_data_attribute(&self, node: NodeId, key: &str, value: &str) {
        self.attributes
            .lock()
            .insert((node, key.to_string()), value.to_string());
    }
    fn remove_data_attribute(&self, node: NodeId, key: &str) {
        self.attributes.lock().remove(&(node, key.to_string()));
    }
}

#[derive(Default)]
pub struct MapSession {
    values: Mutex<HashMap<String, String>>,
}

impl SessionStorage for MapSession {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }
    fn set(&self, key: &str, value: &str) -> ApplicationResult<()> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
    fn remove(&self, key: &str) {
        self.values.lock().remove(key);
    }
}

pub struct Passthrough;

impl ValueFormatter for Passthrough {
    fn format(&self, value: &Value, _format: &str, _clue: Option<&str>) -> Value {
        value.clone()
    }
}

/// A clock that only moves when told to.
pub struct TestClock(Mutex<DateTime<Utc>>);

impl TestClock {
    pub fn new() -> Self {
        Self(Mutex::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default(),
        ))
    }

    pub fn advance(&self, by: Duration) {
        *self.0.lock() += by;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock()
    }
}

pub fn store_on(page: Arc<dyn Page>, settings: Settings) -> (Arc<Store>, Arc<MapSession>) {
    let session = Arc::new(MapSession::default());
    let hooks = Hooks::new();
    let store = Store::new(
        page,
        session.clone(),
        Formatting::new(Arc::new(Passthrough), hooks.clone()),
        hooks,
        Arc::new(settings),
    );
    (Arc::new(store), session)
}

pub fn stub_store(settings: Settings) -> (Arc<Store>, Arc<MapSession>) {
    store_on(Arc::new(NullPage::default()), settings)
}
