//! Render engine: the cycle state machine.
//!
//! ```text
//! Idle → AwaitPending → PreHook → ResolveTemplates → PaintTemplates
//!      → ResolveData → PaintData → Finalize → Idle
//! ```
//!
//! Cycles never overlap: a gate serialises them and each one starts by
//! waiting for the ledger's in-flight set to drain. Every join point is
//! bounded by the soft cycle timeout, after which the cycle carries on with
//! whatever has arrived. A cycle always reaches `Finalize`.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::application::hooks::Hooks;
use crate::application::ports::Page;
use crate::application::services::ledger::{CacheLedger, FetchHandle};
use crate::application::services::substitution::Cloner;
use crate::application::settings::Settings;
use crate::domain::{
    class_directive::{
        DATA_REF_ATTR, DATA_REF_CACHE, FORMAT_CLUE_ATTR, FORMAT_DEFAULT_ATTR, FORMAT_PREFIX,
        HYDRATE_PREFIX, RECORD_CACHE,
    },
    dig, display_value, is_truthy, Directive, DirectiveEntry, EntryKind, FetchSettings,
    FormatClass, HydrateClass, LockState, NodeId, Pocket, StorageTier, Trigger,
    CLONED_CLASS_PREFIX, LOADING_TEMPLATE,
};

/// Ephemeral key holding each expanded clone's record.
pub const RECORD_KEY: &str = "coreRecord";

// ── CyclePhase ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CyclePhase {
    #[default]
    Idle,
    AwaitPending,
    PreHook,
    ResolveTemplates,
    PaintTemplates,
    ResolveData,
    PaintData,
    Finalize,
}

impl CyclePhase {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitPending => "await-pending",
            Self::PreHook => "pre-hook",
            Self::ResolveTemplates => "resolve-templates",
            Self::PaintTemplates => "paint-templates",
            Self::ResolveData => "resolve-data",
            Self::PaintData => "paint-data",
            Self::Finalize => "finalize",
        }
    }
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── CycleReport ──────────────────────────────────────────────────────────────

/// What one cycle did.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub pockets_painted: usize,
    pub templates_requested: usize,
    pub data_requested: usize,
    pub failed_fetches: usize,
    pub clones_expanded: usize,
    pub records_rendered: usize,
    pub elements_hydrated: usize,
    pub elements_formatted: usize,
    pub triggers_bound: usize,
    /// Join points that hit the soft timeout.
    pub timed_out: Vec<CyclePhase>,
    /// Pockets left open because a fetch they need missed the soft timeout.
    pub unresolved: Vec<NodeId>,
    /// Pockets rendered this cycle, as persisted to the route.
    pub directive: Directive,
    pub elapsed: Duration,
}

impl CycleReport {
    fn new() -> Self {
        Self {
            cycle_id: Uuid::new_v4(),
            pockets_painted: 0,
            templates_requested: 0,
            data_requested: 0,
            failed_fetches: 0,
            clones_expanded: 0,
            records_rendered: 0,
            elements_hydrated: 0,
            elements_formatted: 0,
            triggers_bound: 0,
            timed_out: Vec::new(),
            unresolved: Vec::new(),
            directive: Directive::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn timed_out(&self) -> bool {
        !self.timed_out.is_empty()
    }

    fn leave_open(&mut self, pocket: NodeId) {
        if !self.unresolved.contains(&pocket) {
            self.unresolved.push(pocket);
        }
    }
}

// ── RenderEngine ─────────────────────────────────────────────────────────────

pub struct RenderEngine {
    page: Arc<dyn Page>,
    ledger: CacheLedger,
    hooks: Hooks,
    settings: Arc<Settings>,
    phase: RwLock<CyclePhase>,
    gate: tokio::sync::Mutex<()>,
    triggers: RwLock<HashMap<NodeId, Trigger>>,
    cycles_run: AtomicU64,
}

impl RenderEngine {
    pub fn new(page: Arc<dyn Page>, ledger: CacheLedger, hooks: Hooks, settings: Arc<Settings>) -> Self {
        Self {
            page,
            ledger,
            hooks,
            settings,
            phase: RwLock::new(CyclePhase::Idle),
            gate: tokio::sync::Mutex::new(()),
            triggers: RwLock::new(HashMap::new()),
            cycles_run: AtomicU64::new(0),
        }
    }

    pub fn phase(&self) -> CyclePhase {
        *self.phase.read()
    }

    pub fn cycles_run(&self) -> u64 {
        self.cycles_run.load(Ordering::Relaxed)
    }

    /// The trigger bound to `node` by the last cycle.
    pub fn trigger(&self, node: NodeId) -> Option<Trigger> {
        self.triggers.read().get(&node).cloned()
    }

    fn enter(&self, phase: CyclePhase) {
        debug!(%phase, "cycle.phase");
        *self.phase.write() = phase;
    }

    fn open_pockets(&self) -> Vec<Pocket> {
        self.page.pockets().into_iter().filter(Pocket::is_open).collect()
    }

    /// Run one full cycle.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> CycleReport {
        let _gate = self.gate.lock().await;
        let started = Instant::now();
        let mut report = CycleReport::new();
        let timeout = self.settings.cycle_timeout();

        self.enter(CyclePhase::AwaitPending);
        if !self.ledger.await_all_within(timeout).await {
            warn!(
                pending = self.ledger.pending(),
                timeout_ms = timeout.as_millis() as u64,
                "outstanding fetches did not settle, continuing"
            );
            report.timed_out.push(CyclePhase::AwaitPending);
        }

        self.enter(CyclePhase::PreHook);
        self.hooks.run_start_of_cycle();

        self.enter(CyclePhase::ResolveTemplates);
        let pockets = self.open_pockets();
        let handles = self.resolve_templates(&pockets);
        report.templates_requested = handles.len();
        self.join(handles, CyclePhase::ResolveTemplates, &mut report).await;
        if report.timed_out.contains(&CyclePhase::ResolveTemplates) {
            for pocket in self.awaiting_templates(&pockets) {
                report.leave_open(pocket);
            }
        }

        self.enter(CyclePhase::PaintTemplates);
        report.pockets_painted = self.paint_templates(&pockets);

        self.enter(CyclePhase::ResolveData);
        let handles = self.resolve_data();
        report.data_requested = handles.len();
        self.join(handles, CyclePhase::ResolveData, &mut report).await;
        if report.timed_out.contains(&CyclePhase::ResolveData) {
            for pocket in self.awaiting_data() {
                report.leave_open(pocket);
            }
        }

        self.enter(CyclePhase::PaintData);
        self.paint_data(&mut report);
        report.triggers_bound = self.bind_triggers();

        self.enter(CyclePhase::Finalize);
        self.finalize(&mut report).await;

        self.enter(CyclePhase::Idle);
        self.cycles_run.fetch_add(1, Ordering::Relaxed);
        report.elapsed = started.elapsed();

        let elapsed_ms = report.elapsed.as_secs_f64() * 1000.0;
        if self.settings.debug {
            info!(cycle = %report.cycle_id, elapsed_ms, "cycle complete");
        } else {
            debug!(cycle = %report.cycle_id, elapsed_ms, "cycle complete");
        }
        report
    }

    async fn join<T>(&self, handles: Vec<FetchHandle<T>>, phase: CyclePhase, report: &mut CycleReport) {
        if handles.is_empty() {
            return;
        }
        let timeout = self.settings.cycle_timeout();
        match tokio::time::timeout(timeout, join_all(handles)).await {
            Ok(results) => {
                report.failed_fetches += results.iter().filter(|r| r.is_err()).count();
            }
            Err(_) => {
                warn!(%phase, timeout_ms = timeout.as_millis() as u64, "fetches timed out, painting partial data");
                report.timed_out.push(phase);
            }
        }
    }

    /// Request every missing template, showing `LOADING` meanwhile.
    fn resolve_templates(&self, pockets: &[Pocket]) -> Vec<FetchHandle<String>> {
        let store = self.ledger.store();
        let loading = store.raw_template(LOADING_TEMPLATE).unwrap_or_default();
        let mut requested = HashSet::new();
        let mut handles = Vec::new();

        for pocket in pockets {
            let missing: Vec<_> = pocket
                .templates
                .iter()
                .filter(|t| !t.is_empty_template() && !store.has_template(&t.name))
                .collect();
            if missing.is_empty() {
                continue;
            }
            self.page.set_inner_html(pocket.id, &loading);
            for template in missing {
                if requested.insert(template.name.clone()) {
                    handles.push(self.ledger.fetch_template(
                        &template.name,
                        template.source.as_deref(),
                        FetchSettings::default(),
                    ));
                }
            }
        }
        handles
    }

    /// Pockets still missing one of their templates.
    fn awaiting_templates(&self, pockets: &[Pocket]) -> Vec<NodeId> {
        let store = self.ledger.store();
        pockets
            .iter()
            .filter(|p| {
                p.templates
                    .iter()
                    .any(|t| !t.is_empty_template() && !store.has_template(&t.name))
            })
            .map(|p| p.id)
            .collect()
    }

    /// Pockets holding a clone whose data has not arrived.
    fn awaiting_data(&self) -> Vec<NodeId> {
        let store = self.ledger.store();
        self.page
            .clones()
            .into_iter()
            .filter(|m| store.get_data(&m.data_ref, None, None).is_none())
            .filter_map(|m| m.pocket)
            .collect()
    }

    fn paint_templates(&self, pockets: &[Pocket]) -> usize {
        for pocket in pockets {
            self.page.set_inner_html(pocket.id, "");
            for template in &pocket.templates {
                let html = self
                    .ledger
                    .get_template(&template.name)
                    .unwrap_or_else(|| self.settings.alert_missing_template.clone());
                let payload = Value::String(html);
                self.hooks.run_pre_paint(&template.name, &payload, EntryKind::Template);
                if let Value::String(html) = &payload {
                    self.page.append_html(pocket.id, html);
                }
                self.hooks.run_post_paint(&template.name, &payload, EntryKind::Template);
            }
            let awaiting_clones = self.page.contains_clone(pocket.id);
            self.page.set_visible(pocket.id, !awaiting_clones);
        }
        let dropped = self.ledger.store().clear_detached_scopes();
        if dropped > 0 {
            debug!(dropped, "cleared records of repainted clones");
        }
        pockets.len()
    }

    /// Request data for every clone whose key is stale or empty.
    fn resolve_data(&self) -> Vec<FetchHandle<Value>> {
        let store = self.ledger.store();
        let mut requested = HashSet::new();
        let mut handles = Vec::new();

        for marker in self.page.clones() {
            let key = marker.data_ref.as_str();
            if self.ledger.check_fresh(key, EntryKind::Data) && store.get_data(key, None, None).is_some() {
                debug!(key, "clone data is fresh");
                continue;
            }
            if requested.insert(marker.data_ref.clone()) {
                handles.push(
                    self.ledger
                        .fetch_data(key, marker.source.as_deref(), FetchSettings::default()),
                );
            }
        }
        handles
    }

    fn paint_data(&self, report: &mut CycleReport) {
        let store = self.ledger.store();
        let markers = self.page.clones();
        let cloner = Cloner::new(
            store.formatting(),
            &self.hooks,
            &self.settings.default_delta,
            &self.settings.alert_missing_type_reference,
        );

        for marker in &markers {
            let records = match self.ledger.read_data(&marker.data_ref) {
                Some(Value::Array(records)) => records,
                _ => Vec::new(),
            };
            let Some(fragment) = self.page.clone_fragment(marker.id, &marker.cloned_class()) else {
                continue;
            };

            let payload = Value::Array(records);
            self.hooks.run_pre_paint(&marker.data_ref, &payload, EntryKind::Data);
            let records = payload.as_array().map(Vec::as_slice).unwrap_or_default();

            let html = cloner.expand(records, &fragment);
            let nodes = self.page.insert_before(marker.id, &html);
            for (node, record) in nodes.iter().zip(records) {
                store.set_data(RECORD_KEY, record.clone(), Some(*node), Some(StorageTier::Ephemeral));
            }

            self.hooks.run_post_paint(&marker.data_ref, &payload, EntryKind::Data);
            report.clones_expanded += 1;
            report.records_rendered += records.len();
        }

        for marker in &markers {
            if let Some(pocket) = marker.pocket {
                self.page.set_visible(pocket, true);
            }
            self.page.remove(marker.id);
        }
    }

    /// Rebuild the click-trigger table from the current page.
    pub fn bind_triggers(&self) -> usize {
        let bound: HashMap<NodeId, Trigger> = self
            .page
            .activatables()
            .iter()
            .filter_map(|el| Trigger::from_element(el, &self.settings.default_click_target).ok())
            .map(|t| (t.node, t))
            .collect();
        let count = bound.len();
        *self.triggers.write() = bound;
        count
    }

    async fn finalize(&self, report: &mut CycleReport) {
        report.elements_hydrated = self.hydrate();
        tokio::task::yield_now().await;
        report.elements_formatted = self.format_elements();
        self.hooks.run_end_of_cycle();

        let pockets = self.open_pockets();
        let directive: Directive = pockets.iter().map(DirectiveEntry::from).collect();

        if self.settings.routing && !directive.is_empty() {
            match directive.to_fragment() {
                Ok(fragment) => self.page.set_route_fragment(&fragment),
                Err(e) => warn!(error = %e, "directive could not be encoded"),
            }
        }

        if self.settings.locking {
            for pocket in pockets.iter().filter(|p| !report.unresolved.contains(&p.id)) {
                self.page.set_lock_state(pocket.id, LockState::Locked);
            }
            if !report.unresolved.is_empty() {
                debug!(open = report.unresolved.len(), "pockets left open for late fetches");
            }
        }

        report.directive = directive;
    }

    /// Value a hydration class resolves to on `node`.
    fn hydration_value(&self, node: NodeId, attrs_ref: Option<&str>, class: &HydrateClass) -> Value {
        let data = match class.cache.as_str() {
            DATA_REF_CACHE => attrs_ref.and_then(|key| self.ledger.read_data(key)),
            RECORD_CACHE => self
                .page
                .closest_with_class_prefix(node, CLONED_CLASS_PREFIX)
                .and_then(|scope| {
                    self.ledger
                        .store()
                        .get_data(RECORD_KEY, Some(scope), Some(StorageTier::Ephemeral))
                }),
            cache => self.ledger.read_data(cache),
        };

        match data {
            Some(Value::String(s)) => Value::String(s),
            Some(data) => dig(&data, &class.member).unwrap_or(Value::Null),
            None => Value::String(format!("{}*", class.cache)),
        }
    }

    fn hydrate(&self) -> usize {
        let mut touched = 0;
        for element in self.page.elements_with_class_prefix(HYDRATE_PREFIX) {
            let mut hit = false;
            for class in &element.classes {
                if self.settings.hydration_ignore.contains(class) {
                    continue;
                }
                let Some(directive) = HydrateClass::parse(class) else {
                    continue;
                };
                let value = self.hydration_value(element.id, element.attr(DATA_REF_ATTR), &directive);
                if !is_truthy(&value) {
                    continue;
                }
                let text = display_value(&value);
                if element.is_form_control() {
                    self.page.set_value(element.id, &text);
                } else if directive.every_cycle {
                    self.page.set_inner_html(element.id, &text);
                } else {
                    self.page.append_html(element.id, &text);
                }
                if !directive.every_cycle {
                    self.page.remove_class(element.id, class);
                }
                hit = true;
            }
            touched += usize::from(hit);
        }
        touched
    }

    fn format_elements(&self) -> usize {
        let formatting = self.ledger.store().formatting();
        let mut touched = 0;

        for element in self.page.elements_with_class_prefix(FORMAT_PREFIX) {
            let fallback = element
                .attr(FORMAT_DEFAULT_ATTR)
                .unwrap_or(self.settings.default_delta.as_str())
                .to_string();
            let clue = element.attr(FORMAT_CLUE_ATTR);
            let mut text = if element.is_form_control() {
                element.attr("value").unwrap_or_default().to_string()
            } else {
                element.inner_html.clone()
            };
            let mut hit = false;

            for class in &element.classes {
                if self.settings.format_ignore.contains(class) {
                    continue;
                }
                let Some(directive) = FormatClass::parse(class) else {
                    continue;
                };
                if text.is_empty() || text == "null" || text == "undefined" {
                    text = fallback.clone();
                }
                let formatted = formatting.apply(Value::String(text), &directive.format, clue);
                text = display_value(&formatted);
                if !directive.every_cycle {
                    self.page.remove_class(element.id, class);
                }
                hit = true;
            }

            if hit {
                if element.is_form_control() {
                    self.page.set_value(element.id, &text);
                } else {
                    self.page.set_inner_html(element.id, &text);
                }
                touched += 1;
            }
        }
        touched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockFetcher;
    use crate::application::testing::{stub_store, NullPage, TestClock};
    use std::sync::atomic::AtomicUsize;

    fn engine(hooks: Hooks, settings: Settings) -> RenderEngine {
        let (store, _) = stub_store(settings.clone());
        let settings = Arc::new(settings);
        let ledger = CacheLedger::new(
            store,
            Arc::new(MockFetcher::new()),
            Arc::new(TestClock::new()),
            hooks.clone(),
            settings.clone(),
        );
        RenderEngine::new(Arc::new(NullPage::default()), ledger, hooks, settings)
    }

    #[tokio::test]
    async fn empty_page_cycle_reaches_idle() {
        let e = engine(Hooks::new(), Settings::default());
        let report = e.run_cycle().await;
        assert_eq!(e.phase(), CyclePhase::Idle);
        assert_eq!(report.pockets_painted, 0);
        assert!(report.directive.is_empty());
        assert!(!report.timed_out());
        assert_eq!(e.cycles_run(), 1);
    }

    #[tokio::test]
    async fn lifecycle_hooks_bracket_the_cycle() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let (a, b) = (order.clone(), order.clone());
        let hooks = Hooks::builder()
            .start_of_cycle(move || {
                a.lock().push("start");
                Ok(())
            })
            .end_of_cycle(move || {
                b.lock().push("end");
                Ok(())
            })
            .build();
        engine(hooks, Settings::default()).run_cycle().await;
        assert_eq!(*order.lock(), vec!["start", "end"]);
    }

    #[tokio::test]
    async fn throwing_hooks_do_not_abort() {
        let hooks = Hooks::builder()
            .start_of_cycle(|| Err("bad".into()))
            .end_of_cycle(|| panic!("worse"))
            .build();
        let e = engine(hooks, Settings::default());
        e.run_cycle().await;
        assert_eq!(e.phase(), CyclePhase::Idle);
    }

    #[tokio::test]
    async fn cycles_are_serialised() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (r1, p1, r2) = (running.clone(), peak.clone(), running.clone());
        let hooks = Hooks::builder()
            .start_of_cycle(move || {
                let now = r1.fetch_add(1, Ordering::SeqCst) + 1;
                p1.fetch_max(now, Ordering::SeqCst);
                Ok(())
            })
            .end_of_cycle(move || {
                r2.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            })
            .build();
        let e = Arc::new(engine(hooks, Settings::default()));
        let (a, b) = (e.clone(), e.clone());
        tokio::join!(a.run_cycle(), b.run_cycle());
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(e.cycles_run(), 2);
    }

    #[test]
    fn phase_names() {
        assert_eq!(CyclePhase::default(), CyclePhase::Idle);
        assert_eq!(CyclePhase::ResolveData.to_string(), "resolve-data");
    }
}
