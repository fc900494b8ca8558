//! Output management and formatting.
//!
//! Results (the painted page, config values, JSON documents) go to stdout.
//! Status lines go to stderr so results stay pipeable.

use std::io::{self, IsTerminal};

use console::Term;
use owo_colors::OwoColorize;

use crate::cli::global::{GlobalArgs, OutputFormat};
use crate::config::AppConfig;

pub struct OutputManager {
    resolved_format: OutputFormat,
    quiet: bool,
    no_color: bool,
    out: Term,
    status: Term,
}

impl OutputManager {
    pub fn new(args: &GlobalArgs, config: &AppConfig) -> Self {
        let resolved_format = match args.output_format {
            OutputFormat::Auto if io::stdout().is_terminal() => OutputFormat::Human,
            OutputFormat::Auto => OutputFormat::Plain,
            other => other,
        };

        Self {
            resolved_format,
            quiet: args.quiet,
            no_color: args.no_color || config.output.no_color || resolved_format != OutputFormat::Human,
            out: Term::stdout(),
            status: Term::stderr(),
        }
    }

    /// A result line. Never suppressed.
    pub fn print(&self, msg: &str) -> io::Result<()> {
        self.out.write_line(msg)
    }

    /// Pretty-printed JSON document on stdout.
    pub fn json(&self, value: &serde_json::Value) -> io::Result<()> {
        let text = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        self.out.write_line(&text)
    }

    /// `✓ <msg>` on stderr.
    pub fn success(&self, msg: &str) -> io::Result<()> {
        self.status_line("\u{2713}", msg, |s| s.green().bold().to_string())
    }

    /// `⚠ <msg>` on stderr.
    pub fn warning(&self, msg: &str) -> io::Result<()> {
        self.status_line("\u{26a0}", msg, |s| s.yellow().bold().to_string())
    }

    /// `ℹ <msg>` on stderr.
    pub fn info(&self, msg: &str) -> io::Result<()> {
        self.status_line("\u{2139}", msg, |s| s.blue().bold().to_string())
    }

    pub fn header(&self, text: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let line = if self.no_color {
            text.to_owned()
        } else {
            text.cyan().bold().to_string()
        };
        self.out.write_line(&line)
    }

    fn status_line(&self, icon: &str, msg: &str, paint: impl Fn(&str) -> String) -> io::Result<()> {
        if self.quiet || self.resolved_format == OutputFormat::Json {
            return Ok(());
        }
        let line = if self.no_color {
            format!("{icon} {msg}")
        } else {
            format!("{} {msg}", paint(icon))
        };
        self.status.write_line(&line)
    }

    pub fn supports_color(&self) -> bool {
        !self.no_color
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// The resolved (non-Auto) output format.
    pub fn format(&self) -> OutputFormat {
        self.resolved_format
    }
}
