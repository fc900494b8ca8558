//! `pocket render`: load a page, run render cycles, print the painted page.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use pocket_adapters::{
    BuiltinFormatter, FileFetcher, FileSession, HttpFetcher, MemoryPage, MemorySession, SystemClock,
    TemplateLoader,
};
use pocket_core::application::ports::{Fetcher, SessionStorage};
use pocket_core::application::{CycleReport, Framework, Settings};

use crate::{
    cli::{OutputFormat, RenderArgs},
    config::AppConfig,
    error::{CliError, CliResult, IntoCli},
    output::OutputManager,
};

pub fn execute(args: RenderArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .with_cli_context(|| "starting the async runtime")?;
    runtime.block_on(render(args, config, &output))
}

#[instrument(skip_all, fields(page = %args.page.display()))]
async fn render(args: RenderArgs, config: AppConfig, output: &OutputManager) -> CliResult<()> {
    let html = read_page(&args.page)?;
    let settings = engine_settings(&args, &config);
    let url = args.url.clone().unwrap_or_else(|| config.render.url.clone());
    let page = Arc::new(MemoryPage::new(&html).with_url(&url));

    let framework = Framework::builder()
        .page(page.clone())
        .fetcher(fetcher(&args, &config)?)
        .session(session(&args, &config)?)
        .clock(Arc::new(SystemClock))
        .formatter(Arc::new(
            BuiltinFormatter::new().with_default_delta(settings.default_delta.clone()),
        ))
        .settings(settings.clone())
        .build()?;

    // Page-preloaded templates registered by init replace same-named files.
    if let Some(dir) = args.templates.as_ref().or(config.render.templates.as_ref()) {
        let templates = TemplateLoader::new(dir).load_all()?;
        info!(count = templates.len(), dir = %dir.display(), "preloading template directory");
        for (name, html) in templates {
            framework.store().set_template(&name, &html);
        }
    }

    let mut reports = vec![framework.init().await];

    for selector in &args.click {
        let node = page.find(selector).ok_or_else(|| CliError::SelectorNotFound {
            selector: selector.clone(),
        })?;
        let report = framework
            .activate(node)
            .await
            .ok_or_else(|| CliError::NotATrigger {
                selector: selector.clone(),
            })?;
        reports.push(report);
    }

    if args.cycles > 0 {
        let period = Duration::from_millis(args.period_ms.max(1));
        reports.extend(framework.run_timer(period, args.cycles).await);
    }

    if !framework.ledger().await_all_within(settings.cycle_timeout()).await {
        output.warning("Some fetches were still in flight when rendering finished")?;
    }

    report(&args, &page, &reports, output)
}

fn read_page(path: &Path) -> CliResult<String> {
    match fs::read_to_string(path) {
        Err(e) if e.kind() == ErrorKind::NotFound => Err(CliError::PageNotFound {
            path: path.to_path_buf(),
        }),
        other => other.with_cli_context(|| format!("reading {}", path.display())),
    }
}

/// Configured engine settings with the command-line overrides applied.
fn engine_settings(args: &RenderArgs, config: &AppConfig) -> Settings {
    let mut settings = config.engine.clone();
    if args.routing {
        settings.routing = true;
    }
    if args.no_locking {
        settings.locking = false;
    }
    if let Some(ms) = args.timeout_ms {
        settings.cycle_timeout_ms = ms;
    }
    settings
}

/// `--root` wins, then a base URL from flags or config, then the page's
/// own directory.
fn fetcher(args: &RenderArgs, config: &AppConfig) -> CliResult<Arc<dyn Fetcher>> {
    if let Some(root) = &args.root {
        debug!(root = %root.display(), "serving fetches from a directory");
        return Ok(Arc::new(FileFetcher::new(root)));
    }
    if let Some(base) = args.base_url.as_ref().or(config.render.base_url.as_ref()) {
        debug!(%base, "fetching over HTTP");
        let timeout = Duration::from_millis(config.render.request_timeout_ms);
        return Ok(Arc::new(HttpFetcher::with_timeout(timeout)?.with_base_url(base)?));
    }
    Ok(Arc::new(FileFetcher::new(page_dir(&args.page))))
}

fn page_dir(page: &Path) -> PathBuf {
    page.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn session(args: &RenderArgs, config: &AppConfig) -> CliResult<Arc<dyn SessionStorage>> {
    match args.session.as_ref().or(config.render.session.as_ref()) {
        Some(path) => Ok(Arc::new(FileSession::open(path)?)),
        None => Ok(Arc::new(MemorySession::new())),
    }
}

// ── output ────────────────────────────────────────────────────────────────────

fn report(
    args: &RenderArgs,
    page: &MemoryPage,
    reports: &[CycleReport],
    output: &OutputManager,
) -> CliResult<()> {
    if output.format() == OutputFormat::Json {
        output.json(&json!({
            "url": page.url(),
            "html": page.html(),
            "cycles": reports.iter().map(cycle_json).collect::<Vec<_>>(),
        }))?;
        return Ok(());
    }

    for report in reports {
        output.info(&cycle_summary(report))?;
        if report.timed_out() {
            let phases: Vec<&str> = report.timed_out.iter().map(|p| p.as_str()).collect();
            output.warning(&format!(
                "Soft timeout hit during {}, {} pocket(s) left open",
                phases.join(", "),
                report.unresolved.len()
            ))?;
        }
    }

    match &args.out {
        Some(path) => {
            fs::write(path, page.html()).with_cli_context(|| format!("writing {}", path.display()))?;
            output.success(&format!("Wrote {}", path.display()))?;
        }
        None => output.print(&page.html())?,
    }
    Ok(())
}

fn cycle_summary(report: &CycleReport) -> String {
    format!(
        "cycle {}: {} pockets, {} templates and {} data fetched, {} records, {} hydrated, {} formatted in {} ms",
        short_id(report),
        report.pockets_painted,
        report.templates_requested,
        report.data_requested,
        report.records_rendered,
        report.elements_hydrated,
        report.elements_formatted,
        report.elapsed.as_millis(),
    )
}

fn short_id(report: &CycleReport) -> String {
    report.cycle_id.simple().to_string().chars().take(8).collect()
}

fn cycle_json(report: &CycleReport) -> Value {
    json!({
        "id": report.cycle_id.to_string(),
        "pockets_painted": report.pockets_painted,
        "templates_requested": report.templates_requested,
        "data_requested": report.data_requested,
        "failed_fetches": report.failed_fetches,
        "clones_expanded": report.clones_expanded,
        "records_rendered": report.records_rendered,
        "elements_hydrated": report.elements_hydrated,
        "elements_formatted": report.elements_formatted,
        "triggers_bound": report.triggers_bound,
        "timed_out": report.timed_out.iter().map(|p| p.as_str()).collect::<Vec<_>>(),
        "left_open": report.unresolved.len(),
        "directive": serde_json::to_value(&report.directive).unwrap_or(Value::Null),
        "elapsed_ms": u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
    })
}
