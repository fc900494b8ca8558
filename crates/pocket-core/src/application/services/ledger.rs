//! Cache ledger: fetch orchestration, freshness and request replay.
//!
//! Every fetch resolves its settings through a preflight step (defaults, then
//! caller settings, then the `preflight` hook), records the result, stamps the
//! entry's creation time and runs on the in-flight set. Completed fetches go
//! through postflight and land in the [`Store`].
//!
//! HTTP failures never surface as errors: data fetches store a failure value
//! in place of the payload and template fetches store the missing-template
//! alert. Only transport failures reach the caller as `Err`.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::application::hooks::Hooks;
use crate::application::ports::{Clock, Fetcher};
use crate::application::services::in_flight::InFlight;
use crate::application::services::store::Store;
use crate::application::services::substitution::DataLookup;
use crate::application::settings::Settings;
use crate::domain::{display_value, parse_json, EntryKind, FetchSettings, FlightStage, RequestRecord};

/// Install detection marker, fetched once at startup.
pub const INTERNAL_CHECK_KEY: &str = "coreInternalCheck";
/// Internal objects, fetched after install detection.
pub const INTERNAL_OBJECTS_KEY: &str = "coreInternalObjects";
/// Top-level keys with this suffix are stripped from internal objects.
pub const INTERNAL_HINT_SUFFIX: &str = "Use";

type EntryId = (EntryKind, String);

/// Future resolving to the outcome of one fetch.
///
/// Dropping a handle does not cancel the fetch.
#[derive(Debug)]
pub struct FetchHandle<T> {
    key: String,
    rx: oneshot::Receiver<ApplicationResult<T>>,
}

impl<T> FetchHandle<T> {
    fn channel(key: &str) -> (oneshot::Sender<ApplicationResult<T>>, Self) {
        let (tx, rx) = oneshot::channel();
        (
            tx,
            Self {
                key: key.to_string(),
                rx,
            },
        )
    }

    fn ready(key: &str, result: ApplicationResult<T>) -> Self {
        let (tx, handle) = Self::channel(key);
        let _ = tx.send(result);
        handle
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl<T> Unpin for FetchHandle<T> {}

impl<T> Future for FetchHandle<T> {
    type Output = ApplicationResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(ApplicationError::FetchAbandoned {
                key: this.key.clone(),
            })),
            Poll::Pending => Poll::Pending,
        }
    }
}

struct LedgerInner {
    store: Arc<Store>,
    fetcher: Arc<dyn Fetcher>,
    clock: Arc<dyn Clock>,
    hooks: Hooks,
    settings: Arc<Settings>,
    created: RwLock<HashMap<EntryId, DateTime<Utc>>>,
    expiry: RwLock<HashMap<EntryId, Duration>>,
    default_expiry: RwLock<Duration>,
    records: RwLock<HashMap<EntryId, RequestRecord>>,
    base_url: RwLock<String>,
    origin: RwLock<Option<String>>,
    in_flight: InFlight,
    refresh_requested: AtomicBool,
}

/// Shared handle to the ledger. Clones refer to the same state.
#[derive(Clone)]
pub struct CacheLedger {
    inner: Arc<LedgerInner>,
}

/// Failure value stored in place of a data payload.
fn failure_value(record: &RequestRecord, parse_error: bool) -> Value {
    let mut failure = json!({
        "success": false,
        "error": true,
        "settings": serde_json::to_value(record).unwrap_or(Value::Null),
    });
    if parse_error {
        failure["parseError"] = Value::Bool(true);
    }
    failure
}

/// An inline JSON array or object passed where a URL was expected.
fn inline_json(source: &str) -> Option<Value> {
    let trimmed = source.trim_start();
    if !(trimmed.starts_with('[') || trimmed.starts_with('{')) {
        return None;
    }
    parse_json(source).filter(|v| v.is_array() || v.is_object())
}

fn strip_hints(value: Value) -> Value {
    match value {
        Value::Object(mut map) => {
            map.retain(|k, _| !k.ends_with(INTERNAL_HINT_SUFFIX));
            Value::Object(map)
        }
        other => other,
    }
}

impl CacheLedger {
    pub fn new(
        store: Arc<Store>,
        fetcher: Arc<dyn Fetcher>,
        clock: Arc<dyn Clock>,
        hooks: Hooks,
        settings: Arc<Settings>,
    ) -> Self {
        let default_expiry = settings.default_expiry();
        let base_url = settings.base_url.clone();
        Self {
            inner: Arc::new(LedgerInner {
                store,
                fetcher,
                clock,
                hooks,
                settings,
                created: RwLock::new(HashMap::new()),
                expiry: RwLock::new(HashMap::new()),
                default_expiry: RwLock::new(default_expiry),
                records: RwLock::new(HashMap::new()),
                base_url: RwLock::new(base_url),
                origin: RwLock::new(None),
                in_flight: InFlight::new(),
                refresh_requested: AtomicBool::new(false),
            }),
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.inner.store
    }

    // ── Freshness ───────────────────────────────────────────────────────────

    /// Whether `key` is inside its expiry window.
    ///
    /// A key that was never stamped counts as fresh.
    pub fn check_fresh(&self, key: &str, kind: EntryKind) -> bool {
        let id = (kind, key.to_string());
        let Some(created) = self.inner.created.read().get(&id).copied() else {
            return true;
        };
        let expiry = self
            .inner
            .expiry
            .read()
            .get(&id)
            .copied()
            .filter(|d| !d.is_zero())
            .unwrap_or_else(|| *self.inner.default_expiry.read());

        match chrono::Duration::from_std(expiry)
            .ok()
            .and_then(|d| created.checked_add_signed(d))
        {
            Some(expires) => self.inner.clock.now() < expires,
            None => true,
        }
    }

    pub fn stamp(&self, key: &str, kind: EntryKind) {
        let now = self.inner.clock.now();
        self.inner.created.write().insert((kind, key.to_string()), now);
    }

    pub fn created_at(&self, key: &str, kind: EntryKind) -> Option<DateTime<Utc>> {
        self.inner.created.read().get(&(kind, key.to_string())).copied()
    }

    /// Per-key expiry override. A zero duration falls back to the default.
    pub fn set_expiry(&self, kind: EntryKind, key: &str, expiry: Duration) {
        self.inner.expiry.write().insert((kind, key.to_string()), expiry);
    }

    pub fn set_default_expiry(&self, expiry: Duration) {
        *self.inner.default_expiry.write() = expiry;
    }

    pub fn default_expiry(&self) -> Duration {
        *self.inner.default_expiry.read()
    }

    // ── Requests ────────────────────────────────────────────────────────────

    /// The last request recorded for `key`.
    pub fn request_record(&self, key: &str, kind: EntryKind) -> Option<RequestRecord> {
        self.inner.records.read().get(&(kind, key.to_string())).cloned()
    }

    fn record(&self, record: &RequestRecord) {
        self.inner
            .records
            .write()
            .insert((record.kind, record.data_ref.clone()), record.clone());
    }

    /// Layer defaults, caller settings and the `preflight` hook result.
    fn preflight(
        &self,
        key: &str,
        source: Option<&str>,
        kind: EntryKind,
        settings: FetchSettings,
    ) -> RequestRecord {
        let now = self.inner.clock.now();
        let pre = RequestRecord::resolve(key, source, kind, settings.clone(), FlightStage::Pre, now);
        self.record(&pre);

        let from_hook = self.inner.hooks.run_preflight(key, &pre.source, kind);
        let merged = settings.merge(from_hook);
        let resolved = RequestRecord::resolve(key, source, kind, merged, FlightStage::Final, now);
        self.record(&resolved);
        resolved
    }

    fn postflight(&self, key: &str, payload: Value, kind: EntryKind) -> Value {
        let payload = match (kind, key) {
            (EntryKind::Data, INTERNAL_CHECK_KEY) => {
                self.on_install_check(&payload);
                payload
            }
            (EntryKind::Data, INTERNAL_OBJECTS_KEY) => strip_hints(payload),
            _ => payload,
        };
        self.inner.hooks.run_postflight(key, payload, kind)
    }

    /// Switch to the page origin when the install marker reports success,
    /// then fetch the internal objects from the effective base URL.
    fn on_install_check(&self, payload: &Value) {
        if payload.get("success").and_then(Value::as_bool) == Some(true) {
            if let Some(origin) = self.inner.origin.read().clone() {
                info!(%origin, "local install detected, switching base URL");
                *self.inner.base_url.write() = origin;
            }
        }
        let source = format!("{}/core.json", self.base_url().trim_end_matches('/'));
        drop(self.fetch_data(INTERNAL_OBJECTS_KEY, Some(&source), FetchSettings::default()));
    }

    /// Fetch JSON data into the store.
    #[instrument(skip(self, settings))]
    pub fn fetch_data(
        &self,
        key: &str,
        source: Option<&str>,
        settings: FetchSettings,
    ) -> FetchHandle<Value> {
        let record = self.preflight(key, source, EntryKind::Data, settings);
        self.stamp(key, EntryKind::Data);

        if let Some(inline) = inline_json(&record.source) {
            debug!(key, "inline JSON source, storing without a fetch");
            let stored = self
                .inner
                .store
                .set_data(key, inline.clone(), None, None)
                .unwrap_or(inline);
            return FetchHandle::ready(key, Ok(stored));
        }

        let (tx, handle) = FetchHandle::channel(key);
        let ledger = self.clone();
        let key = key.to_string();
        self.inner.in_flight.spawn(async move {
            let result = ledger.complete_data(&key, &record).await;
            let _ = tx.send(result);
        });
        handle
    }

    async fn complete_data(&self, key: &str, record: &RequestRecord) -> ApplicationResult<Value> {
        let response = match self.inner.fetcher.fetch(&record.to_request()).await {
            Ok(response) => response,
            Err(e) => {
                warn!(key, error = %e, "data fetch failed in transport");
                return Err(e);
            }
        };

        let value = if !response.is_ok() {
            warn!(key, status = response.status, "data fetch returned a failure status");
            failure_value(record, false)
        } else {
            match serde_json::from_str::<Value>(&response.body) {
                Ok(payload) => self.postflight(key, payload, EntryKind::Data),
                Err(e) => {
                    warn!(key, error = %e, "data response is not JSON");
                    failure_value(record, true)
                }
            }
        };

        debug!(key, "storing fetched data");
        Ok(self
            .inner
            .store
            .set_data(key, value.clone(), None, None)
            .unwrap_or(value))
    }

    /// Fetch a template into the store.
    #[instrument(skip(self, settings))]
    pub fn fetch_template(
        &self,
        key: &str,
        source: Option<&str>,
        settings: FetchSettings,
    ) -> FetchHandle<String> {
        let record = self.preflight(key, source, EntryKind::Template, settings);
        self.stamp(key, EntryKind::Template);

        let (tx, handle) = FetchHandle::channel(key);
        let ledger = self.clone();
        let key = key.to_string();
        self.inner.in_flight.spawn(async move {
            let result = ledger.complete_template(&key, &record).await;
            let _ = tx.send(result);
        });
        handle
    }

    async fn complete_template(&self, key: &str, record: &RequestRecord) -> ApplicationResult<String> {
        let response = match self.inner.fetcher.fetch(&record.to_request()).await {
            Ok(response) => response,
            Err(e) => {
                warn!(key, error = %e, "template fetch failed in transport");
                return Err(e);
            }
        };

        let html = if response.is_ok() {
            match self.postflight(key, Value::String(response.body), EntryKind::Template) {
                Value::String(s) => s,
                other => display_value(&other),
            }
        } else {
            warn!(key, status = response.status, "template fetch returned a failure status");
            self.inner.settings.alert_missing_template.clone()
        };

        self.inner.store.set_template(key, &html);
        Ok(html)
    }

    /// Fetch the install marker from `origin`.
    pub fn check_install(&self, origin: &str) -> FetchHandle<Value> {
        self.set_origin(origin);
        let source = format!(
            "{}{}",
            origin.trim_end_matches('/'),
            self.inner.settings.install_check_path
        );
        self.fetch_data(INTERNAL_CHECK_KEY, Some(&source), FetchSettings::default())
    }

    // ── Reads ───────────────────────────────────────────────────────────────

    /// Read stored data, replaying the recorded request in the background
    /// when the entry is stale. The current value is returned either way.
    pub fn read_data(&self, key: &str) -> Option<Value> {
        let value = self.inner.store.get_data(key, None, None);
        if !self.check_fresh(key, EntryKind::Data) {
            if let Some(record) = self.request_record(key, EntryKind::Data) {
                debug!(key, "stale entry, replaying recorded request");
                self.inner.refresh_requested.store(true, Ordering::SeqCst);
                drop(self.fetch_data(key, None, record.as_settings()));
            }
        }
        value
    }

    /// Stored template with data resolved through [`CacheLedger::read_data`].
    pub fn get_template(&self, name: &str) -> Option<String> {
        self.inner.store.get_template_with(name, self)
    }

    /// Whether a stale read asked for another cycle since the last call.
    pub fn take_refresh_request(&self) -> bool {
        self.inner.refresh_requested.swap(false, Ordering::SeqCst)
    }

    // ── In-flight set ───────────────────────────────────────────────────────

    /// Resolve once every issued fetch has settled, including fetches issued
    /// while waiting.
    pub async fn await_all(&self) {
        self.inner.in_flight.drained().await;
    }

    /// [`CacheLedger::await_all`] bounded by `timeout`. `false` on timeout;
    /// outstanding fetches keep running.
    pub async fn await_all_within(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.await_all()).await.is_ok()
    }

    pub fn pending(&self) -> usize {
        self.inner.in_flight.pending()
    }

    pub fn fetches_issued(&self) -> u64 {
        self.inner.in_flight.spawned_total()
    }

    // ── Base URL ────────────────────────────────────────────────────────────

    pub fn base_url(&self) -> String {
        self.inner.base_url.read().clone()
    }

    pub fn set_origin(&self, origin: &str) {
        *self.inner.origin.write() = Some(origin.to_string());
    }
}

impl DataLookup for CacheLedger {
    fn lookup(&self, key: &str) -> Option<Value> {
        self.read_data(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockFetcher;
    use crate::application::testing::{stub_store, TestClock};
    use crate::domain::{FetchResponse, HttpMethod, RequestBody};
    use std::sync::atomic::AtomicUsize;

    fn ledger_with(fetcher: MockFetcher, clock: Arc<TestClock>, hooks: Hooks) -> CacheLedger {
        let settings = Settings::default();
        let (store, _) = stub_store(settings.clone());
        CacheLedger::new(store, Arc::new(fetcher), clock, hooks, Arc::new(settings))
    }

    fn ok_json(body: &'static str) -> MockFetcher {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .returning(move |_| Ok(FetchResponse::ok(body)));
        fetcher
    }

    #[tokio::test]
    async fn freshness_follows_expiry() {
        let clock = Arc::new(TestClock::new());
        let ledger = ledger_with(ok_json(r#"[1]"#), clock.clone(), Hooks::new());
        ledger.set_expiry(EntryKind::Data, "items", Duration::from_secs(60));

        assert!(ledger.check_fresh("items", EntryKind::Data), "unstamped is fresh");
        ledger.fetch_data("items", Some("/items.json"), FetchSettings::new()).await.unwrap();
        assert!(ledger.check_fresh("items", EntryKind::Data));

        clock.advance(chrono::Duration::seconds(59));
        assert!(ledger.check_fresh("items", EntryKind::Data));
        clock.advance(chrono::Duration::seconds(1));
        assert!(!ledger.check_fresh("items", EntryKind::Data));
    }

    #[tokio::test]
    async fn data_and_template_namespaces_are_separate() {
        let clock = Arc::new(TestClock::new());
        let ledger = ledger_with(ok_json(r#"{"a":1}"#), clock.clone(), Hooks::new());
        ledger.stamp("x", EntryKind::Data);
        clock.advance(chrono::Duration::days(2));
        assert!(!ledger.check_fresh("x", EntryKind::Data));
        assert!(ledger.check_fresh("x", EntryKind::Template));
    }

    #[tokio::test]
    async fn inline_json_skips_the_network() {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().never();
        let ledger = ledger_with(fetcher, Arc::new(TestClock::new()), Hooks::new());
        let value = ledger
            .fetch_data("nums", Some(r#"[1,2,3]"#), FetchSettings::new())
            .await
            .unwrap();
        assert_eq!(value, json!([1, 2, 3]));
        assert_eq!(ledger.store().get_data("nums", None, None), Some(json!([1, 2, 3])));
        assert!(ledger.created_at("nums", EntryKind::Data).is_some());
    }

    #[tokio::test]
    async fn http_failure_stores_failure_value() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_| Ok(FetchResponse::new(500, "oops")));
        let ledger = ledger_with(fetcher, Arc::new(TestClock::new()), Hooks::new());
        let value = ledger.fetch_data("items", Some("/items.json"), FetchSettings::new()).await.unwrap();
        assert_eq!(value["success"], json!(false));
        assert_eq!(value["error"], json!(true));
        assert_eq!(value["settings"]["dataSrc"], json!("/items.json"));
        assert!(value.get("parseError").is_none());
    }

    #[tokio::test]
    async fn malformed_body_flags_parse_error() {
        let ledger = ledger_with(ok_json("<html>"), Arc::new(TestClock::new()), Hooks::new());
        let value = ledger.fetch_data("items", None, FetchSettings::new()).await.unwrap();
        assert_eq!(value["parseError"], json!(true));
    }

    #[tokio::test]
    async fn transport_failure_rejects_the_handle() {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().returning(|req| {
            Err(ApplicationError::Transport {
                url: req.url.clone(),
                reason: "refused".into(),
            })
        });
        let ledger = ledger_with(fetcher, Arc::new(TestClock::new()), Hooks::new());
        let result = ledger.fetch_data("items", Some("/items.json"), FetchSettings::new()).await;
        assert!(matches!(result, Err(ApplicationError::Transport { .. })));
        assert_eq!(ledger.store().get_data("items", None, None), None);
    }

    #[tokio::test]
    async fn missing_template_stores_alert() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_| Ok(FetchResponse::new(404, "")));
        let ledger = ledger_with(fetcher, Arc::new(TestClock::new()), Hooks::new());
        let html = ledger.fetch_template("T", Some("/t.html"), FetchSettings::new()).await.unwrap();
        assert_eq!(html, "Not Found");
        assert_eq!(ledger.store().raw_template("T").as_deref(), Some("Not Found"));
    }

    #[tokio::test]
    async fn preflight_hook_overrides_caller_settings() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .withf(|req| {
                req.method == HttpMethod::Post
                    && req.headers.get("x-token").map(String::as_str) == Some("hook")
                    && matches!(req.body, RequestBody::Json(_))
            })
            .times(1)
            .returning(|_| Ok(FetchResponse::ok("{}")));
        let hooks = Hooks::builder()
            .preflight(|_, _, _| Ok(FetchSettings::new().header("x-token", "hook")))
            .build();
        let ledger = ledger_with(fetcher, Arc::new(TestClock::new()), hooks);

        let mut payload = serde_json::Map::new();
        payload.insert("q".into(), json!("x"));
        ledger
            .fetch_data(
                "search",
                Some("/search"),
                FetchSettings::new().header("x-token", "caller").data(payload),
            )
            .await
            .unwrap();

        let record = ledger.request_record("search", EntryKind::Data).unwrap();
        assert_eq!(record.stage, FlightStage::Final);
        assert_eq!(record.headers.get("x-token").map(String::as_str), Some("hook"));
    }

    #[tokio::test]
    async fn postflight_hook_transforms_payload() {
        let hooks = Hooks::builder()
            .postflight(|_, payload, _| Ok(json!({ "wrapped": payload })))
            .build();
        let ledger = ledger_with(ok_json("[1]"), Arc::new(TestClock::new()), hooks);
        let value = ledger.fetch_data("k", None, FetchSettings::new()).await.unwrap();
        assert_eq!(value, json!({"wrapped": [1]}));
    }

    #[tokio::test]
    async fn await_all_settles_every_fetch() {
        let settled = Arc::new(AtomicUsize::new(0));
        let mut fetcher = MockFetcher::new();
        let s = settled.clone();
        fetcher.expect_fetch().times(3).returning(move |req| {
            s.fetch_add(1, Ordering::SeqCst);
            if req.url.ends_with("bad") {
                Err(ApplicationError::Transport {
                    url: req.url.clone(),
                    reason: "down".into(),
                })
            } else {
                Ok(FetchResponse::ok("[]"))
            }
        });
        let ledger = ledger_with(fetcher, Arc::new(TestClock::new()), Hooks::new());
        for (key, src) in [("a", "/a"), ("b", "/b"), ("c", "/bad")] {
            drop(ledger.fetch_data(key, Some(src), FetchSettings::new()));
        }
        ledger.await_all().await;
        assert_eq!(settled.load(Ordering::SeqCst), 3);
        assert_eq!(ledger.pending(), 0);
        assert_eq!(ledger.fetches_issued(), 3);
    }

    #[tokio::test]
    async fn stale_read_replays_recorded_request() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut fetcher = MockFetcher::new();
        let c = calls.clone();
        fetcher.expect_fetch().returning(move |req| {
            let n = c.fetch_add(1, Ordering::SeqCst);
            assert_eq!(req.url, "/items.json");
            Ok(FetchResponse::ok(format!("[{n}]")))
        });
        let clock = Arc::new(TestClock::new());
        let ledger = ledger_with(fetcher, clock.clone(), Hooks::new());

        ledger.fetch_data("items", Some("/items.json"), FetchSettings::new()).await.unwrap();
        assert_eq!(ledger.read_data("items"), Some(json!([0])));
        assert!(!ledger.take_refresh_request());

        clock.advance(chrono::Duration::days(2));
        assert_eq!(ledger.read_data("items"), Some(json!([0])), "stale value still served");
        assert!(ledger.take_refresh_request());
        ledger.await_all().await;
        assert_eq!(ledger.read_data("items"), Some(json!([1])));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn install_check_switches_base_url_and_strips_hints() {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().returning(|req| {
            let body = match req.url.as_str() {
                "http://localhost:8080/module/install.json" => r#"{"success":true}"#,
                "http://localhost:8080/core.json" => r#"{"pages":1,"pagesUse":"hint"}"#,
                other => panic!("unexpected fetch {other}"),
            };
            Ok(FetchResponse::ok(body))
        });
        let ledger = ledger_with(fetcher, Arc::new(TestClock::new()), Hooks::new());
        ledger.check_install("http://localhost:8080").await.unwrap();
        ledger.await_all().await;

        assert_eq!(ledger.base_url(), "http://localhost:8080");
        assert_eq!(
            ledger.store().get_data(INTERNAL_OBJECTS_KEY, None, None),
            Some(json!({"pages": 1}))
        );
    }

    #[tokio::test]
    async fn failed_install_check_keeps_cdn_base() {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().returning(|req| {
            if req.url.ends_with("install.json") {
                Ok(FetchResponse::ok(r#"{"success":false}"#))
            } else {
                assert!(req.url.starts_with(crate::application::settings::CDN_BASE_URL));
                Ok(FetchResponse::ok("{}"))
            }
        });
        let ledger = ledger_with(fetcher, Arc::new(TestClock::new()), Hooks::new());
        ledger.check_install("http://localhost:8080").await.unwrap();
        ledger.await_all().await;
        assert!(ledger.base_url().starts_with(crate::application::settings::CDN_BASE_URL));
    }

    #[tokio::test]
    async fn get_template_injects_through_ledger_reads() {
        let ledger = ledger_with(ok_json("{}"), Arc::new(TestClock::new()), Hooks::new());
        ledger.store().set_template("T", "<p>{{data:msg:text}}</p>");
        ledger.store().set_data("msg", json!({"text": "hi"}), None, None);
        assert_eq!(ledger.get_template("T").as_deref(), Some("<p>hi</p>"));
    }
}
