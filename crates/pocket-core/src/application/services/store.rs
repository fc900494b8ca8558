//! Store: data values across three tiers plus the template registry.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::application::hooks::Hooks;
use crate::application::ports::{Page, SessionStorage};
use crate::application::services::formatting::Formatting;
use crate::application::services::substitution::{DataLookup, Injector};
use crate::application::settings::Settings;
use crate::domain::{parse_json, NodeId, StorageTier, EMPTY_TEMPLATE, LOADING_TEMPLATE};

/// Keys with this prefix always live in the session tier.
pub const RESERVED_PREFIX: &str = "coreInternal";

/// Key-value storage for fetched data and template strings.
///
/// Data is JSON. Ephemeral values are held in memory against a scope node,
/// attribute values are serialised into the scope's `data-*` attributes and
/// session values go through the [`SessionStorage`] port. Templates are kept
/// percent-escaped so arbitrary markup survives storage untouched.
pub struct Store {
    page: Arc<dyn Page>,
    session: Arc<dyn SessionStorage>,
    formatting: Formatting,
    hooks: Hooks,
    settings: Arc<Settings>,
    ephemeral: RwLock<HashMap<(NodeId, String), Value>>,
    templates: RwLock<BTreeMap<String, String>>,
}

impl Store {
    pub fn new(
        page: Arc<dyn Page>,
        session: Arc<dyn SessionStorage>,
        formatting: Formatting,
        hooks: Hooks,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            page,
            session,
            formatting,
            hooks,
            settings,
            ephemeral: RwLock::new(HashMap::new()),
            templates: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn formatting(&self) -> &Formatting {
        &self.formatting
    }

    /// Register preloaded templates, then make sure `EMPTY` and `LOADING`
    /// exist.
    #[instrument(skip_all, fields(preloaded = preloaded.len()))]
    pub fn init(&self, preloaded: Vec<(String, String)>) {
        for (name, html) in preloaded {
            debug!(template = %name, "registering preloaded template");
            self.set_template(&name, &html);
        }
        if !self.has_template(EMPTY_TEMPLATE) {
            self.set_template(EMPTY_TEMPLATE, &self.settings.empty_template);
        }
        if !self.has_template(LOADING_TEMPLATE) {
            self.set_template(LOADING_TEMPLATE, &self.settings.loading_template);
        }
    }

    fn tier_for(&self, key: &str, tier: Option<StorageTier>) -> StorageTier {
        if key.starts_with(RESERVED_PREFIX) {
            StorageTier::Session
        } else {
            tier.unwrap_or(self.settings.default_storage)
        }
    }

    // ── Data ────────────────────────────────────────────────────────────────

    /// Store `value` and return it as read back from the tier.
    pub fn set_data(
        &self,
        key: &str,
        value: Value,
        scope: Option<NodeId>,
        tier: Option<StorageTier>,
    ) -> Option<Value> {
        let scope = scope.unwrap_or(NodeId::ROOT);
        let tier = self.tier_for(key, tier);
        match tier {
            StorageTier::Ephemeral => {
                self.ephemeral.write().insert((scope, key.to_string()), value);
            }
            StorageTier::Attribute => {
                self.page
                    .set_data_attribute(scope, key, &value.to_string());
            }
            StorageTier::Session => {
                if let Err(e) = self.session.set(key, &value.to_string()) {
                    warn!(key, error = %e, "session write failed");
                }
            }
        }
        self.get_data(key, Some(scope), Some(tier))
    }

    /// Read a value. Missing keys and corrupt persisted values are `None`.
    pub fn get_data(&self, key: &str, scope: Option<NodeId>, tier: Option<StorageTier>) -> Option<Value> {
        let scope = scope.unwrap_or(NodeId::ROOT);
        match self.tier_for(key, tier) {
            StorageTier::Ephemeral => self.ephemeral.read().get(&(scope, key.to_string())).cloned(),
            StorageTier::Attribute => self
                .page
                .data_attribute(scope, key)
                .and_then(|raw| parse_json(&raw)),
            StorageTier::Session => self.session.get(key).and_then(|raw| parse_json(&raw)),
        }
    }

    pub fn delete_data(&self, key: &str, scope: Option<NodeId>, tier: Option<StorageTier>) {
        let scope = scope.unwrap_or(NodeId::ROOT);
        match self.tier_for(key, tier) {
            StorageTier::Ephemeral => {
                self.ephemeral.write().remove(&(scope, key.to_string()));
            }
            StorageTier::Attribute => self.page.remove_data_attribute(scope, key),
            StorageTier::Session => self.session.remove(key),
        }
    }

    /// Forget ephemeral values scoped to nodes that have left the page.
    /// Returns how many were dropped.
    pub fn clear_detached_scopes(&self) -> usize {
        let mut ephemeral = self.ephemeral.write();
        let before = ephemeral.len();
        ephemeral.retain(|(scope, _), _| *scope == NodeId::ROOT || self.page.contains(*scope));
        before - ephemeral.len()
    }

    /// Number of ephemeral values held.
    pub fn ephemeral_len(&self) -> usize {
        self.ephemeral.read().len()
    }

    // ── Templates ───────────────────────────────────────────────────────────

    pub fn set_template(&self, name: &str, html: &str) {
        self.templates
            .write()
            .insert(name.to_string(), urlencoding::encode(html).into_owned());
    }

    /// The stored template without hooks or injection.
    pub fn raw_template(&self, name: &str) -> Option<String> {
        let escaped = self.templates.read().get(name).cloned()?;
        match urlencoding::decode(&escaped) {
            Ok(html) => Some(html.into_owned()),
            Err(e) => {
                warn!(template = name, error = %e, "stored template is not valid UTF-8");
                None
            }
        }
    }

    /// The template with the `get_template` hook applied and current data
    /// injected. Each call materialises the data as it stands.
    pub fn get_template(&self, name: &str) -> Option<String> {
        self.get_template_with(name, self)
    }

    /// As [`Store::get_template`], resolving injected data through `lookup`.
    pub fn get_template_with(&self, name: &str, lookup: &dyn DataLookup) -> Option<String> {
        let raw = self.raw_template(name)?;
        let html = self.hooks.run_get_template(name, raw);
        Some(Injector::new(lookup, &self.formatting, &self.settings.default_delta).inject(&html))
    }

    pub fn delete_template(&self, name: &str) {
        self.templates.write().remove(name);
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.templates.read().contains_key(name)
    }

    pub fn template_names(&self) -> Vec<String> {
        self.templates.read().keys().cloned().collect()
    }
}

impl DataLookup for Store {
    fn lookup(&self, key: &str) -> Option<Value> {
        self.get_data(key, None, None)
    }
}
