//! CLI argument definitions using the clap derive API.
//!
//! Argument names, help text and value enums live here. No rendering logic.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

pub mod global;
pub use global::{GlobalArgs, OutputFormat};

// ── Top-level CLI ─────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name    = "pocket",
    bin_name = "pocket",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "Fetch, cache, bind and paint HTML template pockets",
    long_about = "Pocket loads an HTML page, runs render cycles over its pockets \
                  (fetching templates and data, expanding clones, hydrating and \
                  formatting elements) and prints the painted page.",
    after_help = "EXAMPLES:\n\
        \x20 pocket render site/index.html\n\
        \x20 pocket render index.html --templates site/templates --session .pocket-session.json\n\
        \x20 pocket render index.html --base-url https://example.com --click '#nav-users'\n\
        \x20 pocket completions bash > /usr/share/bash-completion/completions/pocket",
    arg_required_else_help = true,
    subcommand_required    = true,
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

// ── Subcommands ───────────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Render a page and print the result.
    #[command(
        visible_alias = "r",
        about = "Render a page",
        after_help = "EXAMPLES:\n\
            \x20 pocket render index.html\n\
            \x20 pocket render index.html --root site --out painted.html\n\
            \x20 pocket render index.html --routing --url 'http://localhost/#%5B...%5D'\n\
            \x20 pocket render index.html --cycles 3 --period 500"
    )]
    Render(RenderArgs),

    /// Generate shell completion scripts.
    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n\
            \x20 pocket completions bash > ~/.local/share/bash-completion/completions/pocket\n\
            \x20 pocket completions zsh  > ~/.zfunc/_pocket\n\
            \x20 pocket completions fish > ~/.config/fish/completions/pocket.fish"
    )]
    Completions(CompletionsArgs),

    /// Inspect the pocket configuration.
    #[command(
        about = "Configuration management",
        subcommand,
        after_help = "EXAMPLES:\n\
            \x20 pocket config get engine.default_delta\n\
            \x20 pocket config list\n\
            \x20 pocket config path"
    )]
    Config(ConfigCommands),
}

// ── render ────────────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// HTML page to render.
    #[arg(value_name = "PAGE", help = "HTML page to render")]
    pub page: PathBuf,

    /// Directory of `*.html` templates registered before the first cycle.
    #[arg(long = "templates", value_name = "DIR", help = "Preload templates from a directory")]
    pub templates: Option<PathBuf>,

    /// JSON file backing the session storage tier.
    #[arg(long = "session", value_name = "FILE", help = "Persist the session tier to a file")]
    pub session: Option<PathBuf>,

    /// Serve fetches from this directory. Defaults to the page's directory.
    #[arg(
        long = "root",
        value_name = "DIR",
        conflicts_with = "base_url",
        help = "Serve fetches from a local directory"
    )]
    pub root: Option<PathBuf>,

    /// Fetch over HTTP, resolving relative sources against this URL.
    #[arg(long = "base-url", value_name = "URL", help = "Fetch over HTTP from this base URL")]
    pub base_url: Option<String>,

    /// Location reported to the engine, including any route fragment.
    #[arg(long = "url", value_name = "URL", help = "Page location")]
    pub url: Option<String>,

    /// Click a trigger after the first cycle. Repeatable, applied in order.
    #[arg(long = "click", value_name = "SELECTOR", help = "Activate a click trigger (#id, .class or tag)")]
    pub click: Vec<String>,

    #[arg(long = "routing", help = "Persist rendered pockets into the URL fragment")]
    pub routing: bool,

    #[arg(long = "no-locking", help = "Keep pockets open so every cycle repaints them")]
    pub no_locking: bool,

    /// Extra timer-driven cycles after the clicks.
    #[arg(long = "cycles", value_name = "N", default_value_t = 0, help = "Extra timed cycles")]
    pub cycles: usize,

    /// Period between timed cycles.
    #[arg(long = "period", value_name = "MS", default_value_t = 1000, help = "Milliseconds between timed cycles")]
    pub period_ms: u64,

    /// Soft timeout for each join point in a cycle.
    #[arg(long = "timeout", value_name = "MS", help = "Per-phase soft timeout in milliseconds")]
    pub timeout_ms: Option<u64>,

    /// Write the painted page here instead of stdout.
    #[arg(short = 'o', long = "out", value_name = "FILE", help = "Write the painted page to a file")]
    pub out: Option<PathBuf>,
}

// ── completions ───────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    #[arg(value_enum, help = "Shell to generate completions for")]
    pub shell: Shell,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ── config subcommands ────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the value of a configuration key.
    Get {
        /// Dotted key path, e.g. `engine.default_delta`.
        key: String,
    },
    /// Print the effective configuration as TOML.
    List,
    /// Print the path of the default configuration file.
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_accepts_repeated_clicks() {
        let cli = Cli::try_parse_from([
            "pocket", "render", "index.html", "--click", "#a", "--click", ".b",
        ])
        .unwrap();
        let Commands::Render(args) = cli.command else {
            panic!("expected render");
        };
        assert_eq!(args.click, vec!["#a", ".b"]);
        assert_eq!(args.period_ms, 1000);
        assert!(!args.routing);
    }

    #[test]
    fn root_and_base_url_conflict() {
        let parsed = Cli::try_parse_from([
            "pocket",
            "render",
            "index.html",
            "--root",
            "site",
            "--base-url",
            "https://example.com",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["pocket", "-q", "-v", "config", "path"]).is_err());
    }
}
