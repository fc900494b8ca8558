//! Hook registry: optional user callbacks at fixed lifecycle points.
//!
//! Every hook is an `Option` of a shared closure. Call sites go through the
//! `run_*` methods, which treat an absent hook as a no-op and turn a hook
//! error or panic into a logged warning plus the "absent" outcome. A failing
//! hook never aborts a render cycle.
//!
//! ```
//! use pocket_core::application::Hooks;
//! use serde_json::json;
//!
//! let hooks = Hooks::builder()
//!     .postflight(|_key, payload, _kind| Ok(json!({ "wrapped": payload })))
//!     .build();
//! assert!(hooks.is_registered("postflight"));
//! ```

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::domain::{EntryKind, FetchSettings};

/// Error a hook may return.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Result a hook returns.
pub type HookResult<T> = Result<T, HookError>;

type Lifecycle = Arc<dyn Fn() -> HookResult<()> + Send + Sync>;
type Paint = Arc<dyn Fn(&str, &Value, EntryKind) -> HookResult<()> + Send + Sync>;
type Preflight = Arc<dyn Fn(&str, &str, EntryKind) -> HookResult<FetchSettings> + Send + Sync>;
type Postflight = Arc<dyn Fn(&str, Value, EntryKind) -> HookResult<Value> + Send + Sync>;
type FormatValue = Arc<dyn Fn(Value, &str, Option<&str>) -> HookResult<Value> + Send + Sync>;
type CloneValue = Arc<dyn Fn(&Value, &CloneArgs) -> HookResult<Value> + Send + Sync>;
type CloneString = Arc<dyn Fn(&Value, &CloneArgs) -> HookResult<Option<String>> + Send + Sync>;
type GetTemplate = Arc<dyn Fn(&str, &str) -> HookResult<Option<String>> + Send + Sync>;

/// Context handed to `clone_value` and `clone_string`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneArgs {
    /// Second placeholder argument, e.g. `x` in `{{aug:v:x}}`.
    pub str1: Option<String>,
    /// Third placeholder argument.
    pub str2: Option<String>,
    /// Zero-based record position.
    pub index: usize,
    /// The full placeholder token.
    pub placeholder: String,
    /// The fragment before any substitution.
    pub clone_str: String,
    /// The fragment as substituted so far for this record.
    pub cloning_str: String,
}

/// Registered callbacks. Cloning is cheap; closures are shared.
#[derive(Clone, Default)]
pub struct Hooks {
    init: Option<Lifecycle>,
    start_of_cycle: Option<Lifecycle>,
    end_of_cycle: Option<Lifecycle>,
    pre_paint: Option<Paint>,
    post_paint: Option<Paint>,
    preflight: Option<Preflight>,
    postflight: Option<Postflight>,
    format_value: Option<FormatValue>,
    clone_value: Option<CloneValue>,
    clone_string: Option<CloneString>,
    get_template: Option<GetTemplate>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.registered()).finish()
    }
}

/// Run a hook body, converting errors and panics into `None`.
fn guard<T>(hook: &'static str, body: impl FnOnce() -> HookResult<T>) -> Option<T> {
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            warn!(hook, error = %e, "hook returned an error, ignoring");
            None
        }
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".into());
            warn!(hook, reason, "hook panicked, ignoring");
            None
        }
    }
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> HooksBuilder {
        HooksBuilder::default()
    }

    /// Names of the hooks that are set.
    pub fn registered(&self) -> Vec<&'static str> {
        [
            ("init", self.init.is_some()),
            ("start_of_cycle", self.start_of_cycle.is_some()),
            ("end_of_cycle", self.end_of_cycle.is_some()),
            ("pre_paint", self.pre_paint.is_some()),
            ("post_paint", self.post_paint.is_some()),
            ("preflight", self.preflight.is_some()),
            ("postflight", self.postflight.is_some()),
            ("format_value", self.format_value.is_some()),
            ("clone_value", self.clone_value.is_some()),
            ("clone_string", self.clone_string.is_some()),
            ("get_template", self.get_template.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registered().contains(&name)
    }

    pub fn run_init(&self) {
        if let Some(hook) = &self.init {
            guard("init", || hook());
        }
    }

    pub fn run_start_of_cycle(&self) {
        if let Some(hook) = &self.start_of_cycle {
            guard("start_of_cycle", || hook());
        }
    }

    pub fn run_end_of_cycle(&self) {
        if let Some(hook) = &self.end_of_cycle {
            guard("end_of_cycle", || hook());
        }
    }

    pub fn run_pre_paint(&self, key: &str, payload: &Value, kind: EntryKind) {
        if let Some(hook) = &self.pre_paint {
            guard("pre_paint", || hook(key, payload, kind));
        }
    }

    pub fn run_post_paint(&self, key: &str, payload: &Value, kind: EntryKind) {
        if let Some(hook) = &self.post_paint {
            guard("post_paint", || hook(key, payload, kind));
        }
    }

    /// Settings to layer over the caller's. Empty when absent or failing.
    pub fn run_preflight(&self, key: &str, source: &str, kind: EntryKind) -> FetchSettings {
        self.preflight
            .as_ref()
            .and_then(|hook| guard("preflight", || hook(key, source, kind)))
            .unwrap_or_default()
    }

    /// The transformed payload, or the input when absent or failing.
    pub fn run_postflight(&self, key: &str, payload: Value, kind: EntryKind) -> Value {
        match &self.postflight {
            Some(hook) => {
                let input = payload.clone();
                guard("postflight", move || hook(key, input, kind)).unwrap_or(payload)
            }
            None => payload,
        }
    }

    pub fn run_format_value(&self, value: Value, formats: &str, clue: Option<&str>) -> Value {
        match &self.format_value {
            Some(hook) => {
                let input = value.clone();
                guard("format_value", move || hook(input, formats, clue)).unwrap_or(value)
            }
            None => value,
        }
    }

    /// `None` when absent or failing; the caller substitutes its default.
    pub fn run_clone_value(&self, record: &Value, args: &CloneArgs) -> Option<Value> {
        self.clone_value
            .as_ref()
            .and_then(|hook| guard("clone_value", || hook(record, args)))
    }

    /// A replacement for the whole fragment, if the hook produced one.
    pub fn run_clone_string(&self, record: &Value, args: &CloneArgs) -> Option<String> {
        self.clone_string
            .as_ref()
            .and_then(|hook| guard("clone_string", || hook(record, args)))
            .flatten()
    }

    /// The template after the user rewrite, or `html` unchanged.
    pub fn run_get_template(&self, name: &str, html: String) -> String {
        match &self.get_template {
            Some(hook) => guard("get_template", || hook(name, &html))
                .flatten()
                .unwrap_or(html),
            None => html,
        }
    }
}

/// Builder for [`Hooks`].
#[derive(Default)]
pub struct HooksBuilder {
    hooks: Hooks,
}

impl HooksBuilder {
    pub fn init(mut self, f: impl Fn() -> HookResult<()> + Send + Sync + 'static) -> Self {
        self.hooks.init = Some(Arc::new(f));
        self
    }

    pub fn start_of_cycle(mut self, f: impl Fn() -> HookResult<()> + Send + Sync + 'static) -> Self {
        self.hooks.start_of_cycle = Some(Arc::new(f));
        self
    }

    pub fn end_of_cycle(mut self, f: impl Fn() -> HookResult<()> + Send + Sync + 'static) -> Self {
        self.hooks.end_of_cycle = Some(Arc::new(f));
        self
    }

    pub fn pre_paint(
        mut self,
        f: impl Fn(&str, &Value, EntryKind) -> HookResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.hooks.pre_paint = Some(Arc::new(f));
        self
    }

    pub fn post_paint(
        mut self,
        f: impl Fn(&str, &Value, EntryKind) -> HookResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.hooks.post_paint = Some(Arc::new(f));
        self
    }

    pub fn preflight(
        mut self,
        f: impl Fn(&str, &str, EntryKind) -> HookResult<FetchSettings> + Send + Sync + 'static,
    ) -> Self {
        self.hooks.preflight = Some(Arc::new(f));
        self
    }

    pub fn postflight(
        mut self,
        f: impl Fn(&str, Value, EntryKind) -> HookResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.hooks.postflight = Some(Arc::new(f));
        self
    }

    pub fn format_value(
        mut self,
        f: impl Fn(Value, &str, Option<&str>) -> HookResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.hooks.format_value = Some(Arc::new(f));
        self
    }

    pub fn clone_value(
        mut self,
        f: impl Fn(&Value, &CloneArgs) -> HookResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.hooks.clone_value = Some(Arc::new(f));
        self
    }

    pub fn clone_string(
        mut self,
        f: impl Fn(&Value, &CloneArgs) -> HookResult<Option<String>> + Send + Sync + 'static,
    ) -> Self {
        self.hooks.clone_string = Some(Arc::new(f));
        self
    }

    pub fn get_template(
        mut self,
        f: impl Fn(&str, &str) -> HookResult<Option<String>> + Send + Sync + 'static,
    ) -> Self {
        self.hooks.get_template = Some(Arc::new(f));
        self
    }

    pub fn build(self) -> Hooks {
        self.hooks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn absent_hooks_are_no_ops() {
        let hooks = Hooks::new();
        hooks.run_start_of_cycle();
        assert_eq!(hooks.run_postflight("k", json!(1), EntryKind::Data), json!(1));
        assert_eq!(hooks.run_preflight("k", "/k", EntryKind::Data), FetchSettings::default());
        assert!(hooks.registered().is_empty());
    }

    #[test]
    fn failing_hook_is_treated_as_absent() {
        let hooks = Hooks::builder()
            .postflight(|_, _, _| Err("nope".into()))
            .build();
        assert_eq!(
            hooks.run_postflight("k", json!({"a": 1}), EntryKind::Data),
            json!({"a": 1})
        );
    }

    #[test]
    fn panicking_hook_is_caught() {
        let hooks = Hooks::builder()
            .end_of_cycle(|| panic!("exploded"))
            .format_value(|_, _, _| panic!("also exploded"))
            .build();
        hooks.run_end_of_cycle();
        assert_eq!(hooks.run_format_value(json!("x"), "upper", None), json!("x"));
    }

    #[test]
    fn lifecycle_hooks_fire() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let hooks = Hooks::builder()
            .start_of_cycle(move || {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .build();
        hooks.run_start_of_cycle();
        hooks.run_start_of_cycle();
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(hooks.registered(), vec!["start_of_cycle"]);
    }

    #[test]
    fn get_template_none_keeps_original() {
        let hooks = Hooks::builder()
            .get_template(|name, html| Ok((name == "A").then(|| html.to_uppercase())))
            .build();
        assert_eq!(hooks.run_get_template("A", "<b>x</b>".into()), "<B>X</B>");
        assert_eq!(hooks.run_get_template("B", "<b>x</b>".into()), "<b>x</b>");
    }
}
