//! Full render cycles through the in-memory adapters.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use serde_json::json;

use pocket_adapters::{BuiltinFormatter, ManualClock, MemoryPage, MemorySession, StubFetcher};
use pocket_core::application::ports::{Page, SessionStorage};
use pocket_core::application::services::CyclePhase;
use pocket_core::application::{Framework, Hooks, Settings};
use pocket_core::domain::{EntryKind, FetchSettings, StorageTier, TemplateRef};

struct Harness {
    framework: Framework,
    page: Arc<MemoryPage>,
    fetcher: StubFetcher,
    clock: Arc<ManualClock>,
    session: Arc<MemorySession>,
}

fn harness_with(page: MemoryPage, fetcher: StubFetcher, settings: Settings, hooks: Hooks) -> Harness {
    let page = Arc::new(page);
    let clock = Arc::new(ManualClock::starting_now());
    let session = Arc::new(MemorySession::new());
    let framework = Framework::builder()
        .page(page.clone())
        .fetcher(Arc::new(fetcher.clone()))
        .session(session.clone())
        .clock(clock.clone())
        .formatter(Arc::new(BuiltinFormatter::new()))
        .hooks(hooks)
        .settings(settings)
        .build()
        .unwrap();
    Harness {
        framework,
        page,
        fetcher,
        clock,
        session,
    }
}

fn harness(html: &str, fetcher: StubFetcher) -> Harness {
    harness_with(MemoryPage::new(html), fetcher, Settings::default(), Hooks::new())
}

const ITEM_POCKET: &str = r#"<main id="main"><div class="core-pocket" data-core-templates="ITEM" data-ITEM-core-source="/t.html"></div></main>"#;

const ITEM_TEMPLATE: &str = r#"<div class="core-clone" data-core-data="items" data-core-source="/items.json"><li>{{rec:label}}</li></div>"#;

// ============================================================================
// End to end
// ============================================================================

#[tokio::test]
async fn pocket_renders_fetched_template_and_records() {
    let fetcher = StubFetcher::new()
        .html("/t.html", ITEM_TEMPLATE)
        .json("/items.json", json!([{"label": "x"}, {"label": "y"}]));
    let h = harness(ITEM_POCKET, fetcher);

    let report = h.framework.init().await;

    assert_eq!(h.framework.engine().phase(), CyclePhase::Idle);
    assert_eq!(report.pockets_painted, 1);
    assert_eq!(report.records_rendered, 2);

    let pocket = h.page.find(".core-pocketed").expect("pocket locked after the cycle");
    assert!(!h.page.has_class(pocket, "core-pocket"));
    assert!(h.page.is_visible(pocket));
    let html = h.page.inner_html(pocket);
    assert!(html.contains("<li>x</li>"), "{html}");
    assert!(html.contains("<li>y</li>"), "{html}");
    assert!(!html.contains("core-clone\""), "marker removed: {html}");
    assert_eq!(h.page.find_all_with_class("core-cloned-items").len(), 2);
}

#[tokio::test]
async fn failed_data_fetch_renders_no_records() {
    let fetcher = StubFetcher::new()
        .html("/t.html", ITEM_TEMPLATE)
        .respond("/items.json", 500, "boom");
    let h = harness(ITEM_POCKET, fetcher);

    let report = h.framework.init().await;

    assert_eq!(h.framework.engine().phase(), CyclePhase::Idle);
    assert_eq!(report.records_rendered, 0);
    assert!(!h.page.html().contains("<li>"));
    let failure = h.framework.store().get_data("items", None, None).unwrap();
    assert_eq!(failure["success"], json!(false));
    assert_eq!(failure["error"], json!(true));
    let pocket = h.page.find(".core-pocketed").unwrap();
    assert!(h.page.is_visible(pocket));
}

#[tokio::test]
async fn missing_template_paints_alert() {
    let h = harness(ITEM_POCKET, StubFetcher::new());
    h.framework.init().await;
    let pocket = h.page.find(".core-pocketed").unwrap();
    assert_eq!(h.page.inner_html(pocket), "Not Found");
}

#[tokio::test]
async fn missing_data_key_renders_default_delta() {
    let page = r#"<section id="cr-data"><template name="CARD"><p>{{data:nope:x}}</p></template></section><main id="main"><div class="core-pocket" data-core-templates="CARD"></div></main>"#;
    let h = harness(page, StubFetcher::new());
    h.framework.init().await;
    assert!(h.page.html().contains("<p></p>"), "{}", h.page.html());
}

#[tokio::test]
async fn clone_records_drive_hydration() {
    let template = r#"<div class="core-clone" data-core-data="items"><span class="h-coreRecord-label"></span></div>"#;
    let page = format!(
        r#"<section id="cr-data"><template name="ROWS">{template}</template></section><main id="main"><div class="core-pocket" data-core-templates="ROWS"></div></main>"#
    );
    let h = harness(&page, StubFetcher::new());
    h.framework
        .insert_pocket(
            "core_be_getData",
            vec![TemplateRef::new("items").with_source(r#"[{"label":"one"},{"label":"two"}]"#)],
            false,
        )
        .await;

    h.framework.init().await;

    let rows = h.page.find_all_with_class("core-cloned-items");
    let texts: Vec<String> = rows.iter().map(|r| h.page.text_content(*r)).collect();
    assert_eq!(texts, vec!["one", "two"]);
}

// ============================================================================
// Class directives
// ============================================================================

#[tokio::test]
async fn hydrate_and_format_classes() {
    let page = r#"<span id="once" class="h-user-name"></span><input id="field" class="h--user-name"><b id="shout" class="f-upper">ada</b>"#;
    let h = harness(page, StubFetcher::new());
    h.framework
        .insert_pocket(
            "core_be_getData",
            vec![TemplateRef::new("user").with_source(r#"{"name":"Ada"}"#)],
            false,
        )
        .await;

    let report = h.framework.init().await;

    let once = h.page.find("#once").unwrap();
    assert_eq!(h.page.text_content(once), "Ada");
    assert!(!h.page.has_class(once, "h-user-name"));

    let field = h.page.find("#field").unwrap();
    assert_eq!(h.page.attribute(field, "value").as_deref(), Some("Ada"));
    assert!(h.page.has_class(field, "h--user-name"));

    let shout = h.page.find("#shout").unwrap();
    assert_eq!(h.page.text_content(shout), "ADA");
    assert!(!h.page.has_class(shout, "f-upper"));

    assert_eq!(report.elements_hydrated, 2);
    assert_eq!(report.elements_formatted, 1);
}

// ============================================================================
// Cache ledger
// ============================================================================

#[tokio::test]
async fn freshness_expires_with_the_clock() {
    let h = harness("", StubFetcher::new().json("/u.json", json!({"a": 1})));
    let ledger = h.framework.ledger();
    ledger
        .fetch_data("user", Some("/u.json"), FetchSettings::default())
        .await
        .unwrap();
    assert!(ledger.check_fresh("user", EntryKind::Data));

    ledger.set_expiry(EntryKind::Data, "user", Duration::from_secs(60));
    h.clock.advance(ChronoDuration::seconds(59));
    assert!(ledger.check_fresh("user", EntryKind::Data));
    h.clock.advance(ChronoDuration::seconds(2));
    assert!(!ledger.check_fresh("user", EntryKind::Data));
}

#[tokio::test(start_paused = true)]
async fn await_all_waits_for_every_fetch() {
    let fetcher = StubFetcher::new()
        .slow("/a", Duration::from_millis(30), 200, "1")
        .slow("/b", Duration::from_millis(10), 200, "2")
        .fail("/c", "connection refused");
    let h = harness("", fetcher);
    let ledger = h.framework.ledger();

    for (key, url) in [("a", "/a"), ("b", "/b"), ("c", "/c")] {
        drop(ledger.fetch_data(key, Some(url), FetchSettings::default()));
    }
    assert_eq!(ledger.pending(), 3);

    ledger.await_all().await;

    assert_eq!(ledger.pending(), 0);
    assert_eq!(h.fetcher.calls(), 3);
    let store = h.framework.store();
    assert_eq!(store.get_data("a", None, None), Some(json!(1)));
    assert_eq!(store.get_data("b", None, None), Some(json!(2)));
    assert_eq!(store.get_data("c", None, None), None);
}

#[tokio::test]
async fn reserved_keys_live_in_the_session_tier() {
    let h = harness("", StubFetcher::new());
    let store = h.framework.store();
    store.set_data("coreInternalFoo", json!({"x": 1}), None, Some(StorageTier::Attribute));

    assert!(h.session.get("coreInternalFoo").is_some());
    assert_eq!(
        store.get_data("coreInternalFoo", None, Some(StorageTier::Ephemeral)),
        Some(json!({"x": 1}))
    );
    assert_eq!(h.page.data_attribute(pocket_core::domain::NodeId::ROOT, "coreInternalFoo"), None);
}

#[tokio::test]
async fn stale_reads_refetch_and_repaint() {
    let page = r#"<section id="cr-data"><template name="CARD"><p>{{data:user:name}}</p></template></section><main id="main"><div class="core-pocket" data-core-templates="CARD"></div></main>"#;
    let fetcher = StubFetcher::new().json("/user.json", json!({"name": "Ada"}));
    let h = harness_with(
        MemoryPage::new(page),
        fetcher,
        Settings::default().with_locking(false),
        Hooks::new(),
    );
    h.framework
        .insert_pocket(
            "core_be_getData",
            vec![TemplateRef::new("user").with_source("/user.json")],
            false,
        )
        .await;
    h.framework.init().await;
    assert!(h.page.html().contains("<p>Ada</p>"));

    h.fetcher.set_json("/user.json", json!({"name": "Grace"}));
    h.clock.advance(ChronoDuration::days(2));
    h.framework.render().await;

    assert!(h.page.html().contains("<p>Grace</p>"), "{}", h.page.html());
    assert_eq!(h.fetcher.calls_to("/user.json"), 2);
}

// ============================================================================
// Triggers and routing
// ============================================================================

const CARD_PAGE: &str = r##"<section id="cr-data"><template name="CARD"><p>card</p></template></section><a id="go" data-core-templates="CARD" target="#main">Go</a><main id="main"></main>"##;

#[tokio::test]
async fn click_trigger_inserts_and_paints_a_pocket() {
    let h = harness(CARD_PAGE, StubFetcher::new());
    h.framework.init().await;
    assert!(h.page.find(".core-pocket").is_none());

    let link = h.page.find("#go").unwrap();
    let report = h.framework.activate(link).await.expect("link is a trigger");

    assert_eq!(report.pockets_painted, 1);
    let main = h.page.find("#main").unwrap();
    assert!(h.page.inner_html(main).contains("<p>card</p>"));
}

#[tokio::test]
async fn routed_directive_rebuilds_pockets_on_reload() {
    let settings = Settings::default().with_routing(true);
    let first = harness_with(MemoryPage::new(CARD_PAGE), StubFetcher::new(), settings.clone(), Hooks::new());
    first.framework.init().await;
    let link = first.page.find("#go").unwrap();
    first.framework.activate(link).await;

    let hash = first.page.location().hash;
    assert!(hash.starts_with('#') && hash.len() > 1);

    let reloaded = MemoryPage::new(CARD_PAGE).with_url(&format!("http://localhost/{hash}"));
    let second = harness_with(reloaded, StubFetcher::new(), settings, Hooks::new());
    second.framework.init().await;

    let main = second.page.find("#main").unwrap();
    assert!(second.page.inner_html(main).contains("<p>card</p>"));
}

// ============================================================================
// Hooks and timeouts
// ============================================================================

#[tokio::test]
async fn paint_hooks_see_templates_and_data() {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    let hooks = Hooks::builder()
        .post_paint(move |_key, _payload, _kind| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .pre_paint(|_key, _payload, _kind| Err("pre-paint always fails".into()))
        .build();
    let fetcher = StubFetcher::new()
        .html("/t.html", ITEM_TEMPLATE)
        .json("/items.json", json!([{"label": "x"}]));
    let h = harness_with(MemoryPage::new(ITEM_POCKET), fetcher, Settings::default(), hooks);

    h.framework.init().await;

    // one template paint plus one data paint
    assert_eq!(seen.load(Ordering::SeqCst), 2);
    assert!(h.page.html().contains("<li>x</li>"));
}

#[tokio::test(start_paused = true)]
async fn stuck_fetch_hits_the_soft_timeout() {
    let fetcher = StubFetcher::new().slow("/t.html", Duration::from_secs(30), 200, "<p>late</p>");
    let settings = Settings::default().with_cycle_timeout(Duration::from_millis(100));
    let h = harness_with(MemoryPage::new(ITEM_POCKET), fetcher, settings, Hooks::new());

    let report = h.framework.init().await;

    assert!(report.timed_out.contains(&CyclePhase::ResolveTemplates));
    assert_eq!(h.framework.engine().phase(), CyclePhase::Idle);
    assert!(h.page.html().contains("Not Found"));
}

#[tokio::test(start_paused = true)]
async fn late_template_paints_on_the_next_render() {
    let fetcher = StubFetcher::new().slow("/t.html", Duration::from_millis(300), 200, "<p>late</p>");
    let settings = Settings::default().with_cycle_timeout(Duration::from_millis(100));
    let h = harness_with(MemoryPage::new(ITEM_POCKET), fetcher, settings, Hooks::new());

    let first = h.framework.init().await;
    let pocket = h.page.find(".core-pocket").expect("pocket stays open after a timeout");
    assert_eq!(first.unresolved, vec![pocket]);
    assert!(h.page.find(".core-pocketed").is_none());

    h.framework.ledger().await_all().await;
    let second = h.framework.render().await;

    assert_eq!(second.pockets_painted, 1);
    assert!(second.unresolved.is_empty());
    assert_eq!(h.page.inner_html(pocket), "<p>late</p>");
    assert!(h.page.has_class(pocket, "core-pocketed"));
}

// ============================================================================
// Text and repaint hygiene
// ============================================================================

#[tokio::test]
async fn multibyte_records_render() {
    let fetcher = StubFetcher::new()
        .html("/t.html", ITEM_TEMPLATE)
        .json("/items.json", json!([{"label": "élan"}, {"label": "日本"}]));
    let h = harness(ITEM_POCKET, fetcher);

    let report = h.framework.init().await;

    assert_eq!(report.records_rendered, 2);
    let html = h.page.html();
    assert!(html.contains("<li>élan</li>"), "{html}");
    assert!(html.contains("<li>日本</li>"), "{html}");
}

#[tokio::test]
async fn unlocked_repaints_drop_old_clone_records() {
    let fetcher = StubFetcher::new()
        .html("/t.html", ITEM_TEMPLATE)
        .json("/items.json", json!([{"label": "x"}, {"label": "y"}]));
    let h = harness_with(
        MemoryPage::new(ITEM_POCKET),
        fetcher,
        Settings::default().with_locking(false),
        Hooks::new(),
    );

    h.framework.init().await;
    let settled = h.page.html();
    assert_eq!(h.framework.store().ephemeral_len(), 2);

    for _ in 0..5 {
        h.framework.render().await;
    }

    assert_eq!(h.framework.store().ephemeral_len(), 2);
    assert_eq!(h.page.find_all_with_class("core-cloned-items").len(), 2);
    assert_eq!(h.page.html(), settled);
}

#[tokio::test]
async fn init_reads_the_install_marker() {
    let h = harness("", StubFetcher::new());
    h.framework.init().await;
    h.framework.ledger().await_all().await;

    assert_eq!(h.fetcher.calls_to("http://localhost/module/install.json"), 1);
    let marker = h.session.get("coreInternalCheck").expect("failure value stored");
    assert!(marker.contains(r#""success":false"#), "{marker}");
}
