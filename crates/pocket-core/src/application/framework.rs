//! The assembled framework a host drives.
//!
//! One [`Framework`] owns one store, one cache ledger and one render engine,
//! all sharing the same hooks and settings. Hosts call [`Framework::init`]
//! once, then [`Framework::render`], [`Framework::activate`] or
//! [`Framework::insert_pocket`] as triggers arrive.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::application::error::ApplicationError;
use crate::application::hooks::Hooks;
use crate::application::ports::{Clock, Fetcher, Page, SessionStorage, ValueFormatter};
use crate::application::services::{
    formatting::Formatting, CacheLedger, CycleReport, RenderEngine, Store,
};
use crate::application::settings::Settings;
use crate::domain::{Directive, FetchSettings, NodeId, TemplateRef};
use crate::error::PocketResult;

/// Insert targets containing this marker only warm the cache.
pub const SILENT_TARGET_MARKER: &str = "core_be_get";

pub struct Framework {
    page: Arc<dyn Page>,
    store: Arc<Store>,
    ledger: CacheLedger,
    engine: Arc<RenderEngine>,
    hooks: Hooks,
    settings: Arc<Settings>,
}

impl Framework {
    pub fn builder() -> FrameworkBuilder {
        FrameworkBuilder::default()
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn ledger(&self) -> &CacheLedger {
        &self.ledger
    }

    pub fn engine(&self) -> &Arc<RenderEngine> {
        &self.engine
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Startup: register preloaded templates, bind triggers, run the `init`
    /// hook, start install detection, replay a routed directive and paint
    /// the first cycle.
    #[instrument(skip(self))]
    pub async fn init(&self) -> CycleReport {
        self.store.init(self.page.preloaded_templates());
        let bound = self.engine.bind_triggers();
        debug!(bound, "click triggers bound");
        self.hooks.run_init();

        let location = self.page.location();
        if self.settings.install_check {
            self.ledger.set_origin(&location.origin);
            drop(self.ledger.check_install(&location.origin));
        }

        if self.settings.routing && Directive::looks_like_fragment(&location.hash) {
            match Directive::from_fragment(&location.hash) {
                Ok(directive) => {
                    info!(pockets = directive.len(), "replaying routed directive");
                    for entry in directive {
                        self.place_pocket(&entry.target, &entry.templates);
                    }
                }
                Err(e) => warn!(error = %e, "route fragment ignored"),
            }
        }

        self.render().await
    }

    /// Run one cycle, plus one follow-up when a stale read replayed a
    /// request during it.
    pub async fn render(&self) -> CycleReport {
        let report = self.engine.run_cycle().await;
        if self.ledger.take_refresh_request() {
            debug!("stale entries were refreshed, running a follow-up cycle");
            return self.engine.run_cycle().await;
        }
        report
    }

    /// Handle a click on `node`. `None` when the node is not a bound trigger.
    pub async fn activate(&self, node: NodeId) -> Option<CycleReport> {
        let Some(trigger) = self.engine.trigger(node) else {
            debug!(%node, "not a trigger");
            return None;
        };
        self.insert_pocket(&trigger.target, trigger.templates, true).await
    }

    /// Put a new pocket into `target`, or warm the cache when the target is
    /// silent. A cycle runs afterwards when `auto_fill` is set.
    #[instrument(skip(self, templates))]
    pub async fn insert_pocket(
        &self,
        target: &str,
        templates: Vec<TemplateRef>,
        auto_fill: bool,
    ) -> Option<CycleReport> {
        if templates.is_empty() {
            return None;
        }

        if target.contains(SILENT_TARGET_MARKER) {
            let data = target.contains("Data");
            for template in &templates {
                let source = template.source.as_deref();
                if data {
                    drop(self.ledger.fetch_data(&template.name, source, FetchSettings::default()));
                } else {
                    drop(self.ledger.fetch_template(&template.name, source, FetchSettings::default()));
                }
            }
            return None;
        }

        self.place_pocket(target, &templates);
        if auto_fill {
            Some(self.render().await)
        } else {
            None
        }
    }

    fn place_pocket(&self, target: &str, templates: &[TemplateRef]) {
        if self.page.insert_pocket(target, templates).is_none() {
            warn!(target, "pocket target not found");
        }
    }

    /// Re-render every `period`, `cycles` times.
    pub async fn run_timer(&self, period: Duration, cycles: usize) -> Vec<CycleReport> {
        let mut interval = tokio::time::interval(period);
        let mut reports = Vec::with_capacity(cycles);
        for _ in 0..cycles {
            interval.tick().await;
            reports.push(self.render().await);
        }
        reports
    }
}

// ── Builder ──────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FrameworkBuilder {
    page: Option<Arc<dyn Page>>,
    fetcher: Option<Arc<dyn Fetcher>>,
    session: Option<Arc<dyn SessionStorage>>,
    clock: Option<Arc<dyn Clock>>,
    formatter: Option<Arc<dyn ValueFormatter>>,
    hooks: Hooks,
    settings: Settings,
}

impl FrameworkBuilder {
    pub fn page(mut self, page: Arc<dyn Page>) -> Self {
        self.page = Some(page);
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn session(mut self, session: Arc<dyn SessionStorage>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn formatter(mut self, formatter: Arc<dyn ValueFormatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> PocketResult<Framework> {
        let page = self
            .page
            .ok_or(ApplicationError::AdapterNotConfigured { name: "page" })?;
        let fetcher = self
            .fetcher
            .ok_or(ApplicationError::AdapterNotConfigured { name: "fetcher" })?;
        let session = self
            .session
            .ok_or(ApplicationError::AdapterNotConfigured { name: "session" })?;
        let clock = self
            .clock
            .ok_or(ApplicationError::AdapterNotConfigured { name: "clock" })?;
        let formatter = self
            .formatter
            .ok_or(ApplicationError::AdapterNotConfigured { name: "formatter" })?;

        let settings = Arc::new(self.settings);
        let hooks = self.hooks;
        let formatting = Formatting::new(formatter, hooks.clone());
        let store = Arc::new(Store::new(
            page.clone(),
            session,
            formatting,
            hooks.clone(),
            settings.clone(),
        ));
        let ledger = CacheLedger::new(store.clone(), fetcher, clock, hooks.clone(), settings.clone());
        let engine = Arc::new(RenderEngine::new(
            page.clone(),
            ledger.clone(),
            hooks.clone(),
            settings.clone(),
        ));

        Ok(Framework {
            page,
            store,
            ledger,
            engine,
            hooks,
            settings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockFetcher;
    use crate::application::services::ledger::INTERNAL_CHECK_KEY;
    use crate::application::testing::{MapSession, NullPage, Passthrough, TestClock};
    use crate::domain::FetchResponse;
    use crate::error::PocketError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn not_found() -> MockFetcher {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_| Ok(FetchResponse::new(404, "")));
        fetcher
    }

    fn builder() -> FrameworkBuilder {
        Framework::builder()
            .page(Arc::new(NullPage::default()))
            .fetcher(Arc::new(not_found()))
            .session(Arc::new(MapSession::default()))
            .clock(Arc::new(TestClock::new()))
            .formatter(Arc::new(Passthrough))
    }

    #[test]
    fn missing_port_is_reported_by_name() {
        let err = Framework::builder()
            .page(Arc::new(NullPage::default()))
            .build()
            .err()
            .unwrap();
        assert!(matches!(
            err,
            PocketError::Application(ApplicationError::AdapterNotConfigured { name: "fetcher" })
        ));
    }

    #[tokio::test]
    async fn init_runs_hook_and_first_cycle() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let hooks = Hooks::builder()
            .init(move || {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .build();
        let framework = builder().hooks(hooks).build().unwrap();

        framework.init().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(framework.engine().cycles_run(), 1);
        assert!(framework.store().has_template("EMPTY"));
        assert!(framework.store().has_template("LOADING"));
    }

    #[tokio::test]
    async fn init_fetches_the_install_marker_once() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .withf(|req| req.url == "http://localhost/module/install.json")
            .times(1)
            .returning(|_| Ok(FetchResponse::ok(r#"{"success":false}"#)));
        fetcher
            .expect_fetch()
            .withf(|req| req.url.ends_with("/core.json"))
            .returning(|_| Ok(FetchResponse::new(404, "")));
        let framework = builder().fetcher(Arc::new(fetcher)).build().unwrap();

        framework.init().await;
        framework.ledger().await_all().await;

        assert_eq!(
            framework.store().get_data(INTERNAL_CHECK_KEY, None, None),
            Some(json!({"success": false}))
        );
    }

    #[tokio::test]
    async fn install_check_can_be_switched_off() {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().never();
        let settings = Settings {
            install_check: false,
            ..Settings::default()
        };
        let framework = builder()
            .fetcher(Arc::new(fetcher))
            .settings(settings)
            .build()
            .unwrap();

        framework.init().await;

        assert_eq!(framework.ledger().fetches_issued(), 0);
    }

    #[tokio::test]
    async fn silent_target_only_warms_the_cache() {
        let framework = builder().build().unwrap();
        let refs = vec![TemplateRef::new("users").with_source(r#"[{"name":"Ada"}]"#)];

        let report = framework.insert_pocket("core_be_getData", refs, true).await;

        assert!(report.is_none());
        assert_eq!(framework.engine().cycles_run(), 0);
        assert_eq!(
            framework.store().get_data("users", None, None),
            Some(json!([{"name": "Ada"}]))
        );
    }

    #[tokio::test]
    async fn unknown_trigger_does_nothing() {
        let framework = builder().build().unwrap();
        assert!(framework.activate(NodeId(42)).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn timer_renders_each_period() {
        let framework = builder().build().unwrap();
        let reports = framework.run_timer(Duration::from_millis(50), 3).await;
        assert_eq!(reports.len(), 3);
        assert_eq!(framework.engine().cycles_run(), 3);
    }
}
