//! Runtime settings for one framework instance.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::StorageTier;

/// Base URL used before install detection switches to the page origin.
pub const CDN_BASE_URL: &str = "https://cdn.jsdelivr.net/gh/Sitezip/core.sbs";

/// Tunables shared by the store, the ledger and the engine.
///
/// Every field has a default, so a partial TOML or JSON document
/// deserialises cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Text substituted for placeholders that resolve to nothing.
    pub default_delta: String,
    /// Fallback body of the `LOADING` template.
    pub loading_template: String,
    /// Fallback body of the `EMPTY` template.
    pub empty_template: String,
    /// Template body stored when a template fetch fails.
    pub alert_missing_template: String,
    /// Prefix of the marker left for unknown placeholder types.
    pub alert_missing_type_reference: String,
    /// Where click triggers without a `target` attribute insert pockets.
    pub default_click_target: String,
    /// `h-` classes that are styling, not hydration.
    pub hydration_ignore: Vec<String>,
    /// `f-` classes that are styling, not formatting.
    pub format_ignore: Vec<String>,
    /// Seconds an entry stays fresh without a per-key override.
    pub default_expiry_secs: u64,
    pub default_storage: StorageTier,
    /// Persist each cycle's directive into the URL fragment.
    pub routing: bool,
    /// Lock pockets after they render.
    pub locking: bool,
    /// Log cycle timings at info level.
    pub debug: bool,
    /// Soft timeout for each join point in a cycle.
    pub cycle_timeout_ms: u64,
    pub base_url: String,
    /// Fetch the install marker at startup.
    pub install_check: bool,
    pub install_check_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_delta: String::new(),
            loading_template: r#"<marquee width="50%">loading...</marquee>"#.into(),
            empty_template: String::new(),
            alert_missing_template: "Not Found".into(),
            alert_missing_type_reference: "Unrecognized type".into(),
            default_click_target: "main".into(),
            hydration_ignore: vec!["h-100".into()],
            format_ignore: Vec::new(),
            default_expiry_secs: 86_400,
            default_storage: StorageTier::Attribute,
            routing: false,
            locking: true,
            debug: false,
            cycle_timeout_ms: 2_000,
            base_url: format!("{}@{}", CDN_BASE_URL, crate::VERSION),
            install_check: true,
            install_check_path: "/module/install.json".into(),
        }
    }
}

impl Settings {
    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_millis(self.cycle_timeout_ms)
    }

    pub fn default_expiry(&self) -> Duration {
        Duration::from_secs(self.default_expiry_secs)
    }

    pub fn with_routing(mut self, routing: bool) -> Self {
        self.routing = routing;
        self
    }

    pub fn with_locking(mut self, locking: bool) -> Self {
        self.locking = locking;
        self
    }

    pub fn with_default_delta(mut self, delta: impl Into<String>) -> Self {
        self.default_delta = delta.into();
        self
    }

    pub fn with_cycle_timeout(mut self, timeout: Duration) -> Self {
        self.cycle_timeout_ms = timeout.as_millis() as u64;
        self
    }
}
