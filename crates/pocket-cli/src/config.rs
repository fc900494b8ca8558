//! Application configuration.
//!
//! [`AppConfig`] is loaded once at startup and passed down by value. The
//! `engine` table deserialises straight into the core [`Settings`].
//!
//! # Resolution order (highest priority first)
//!
//! 1. CLI flags (applied by the command, not here)
//! 2. `POCKET_*` environment variables, `__` separating tables
//!    (`POCKET_ENGINE__DEFAULT_DELTA=-`)
//! 3. Config file (`--config`, or the platform config directory)
//! 4. Built-in defaults

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use pocket_core::application::Settings;

pub const ENV_PREFIX: &str = "POCKET";

pub const DEFAULT_PAGE_URL: &str = "http://localhost/";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub output: OutputConfig,
    pub render: RenderConfig,
    pub engine: Settings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub no_color: bool,
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            no_color: false,
            format: "human".into(),
        }
    }
}

/// Defaults for `pocket render` flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub url: String,
    pub templates: Option<PathBuf>,
    pub session: Option<PathBuf>,
    pub base_url: Option<String>,
    /// Timeout for a single HTTP request, in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_PAGE_URL.into(),
            templates: None,
            session: None,
            base_url: None,
            request_timeout_ms: 10_000,
        }
    }
}

impl AppConfig {
    /// Layer defaults, the config file and the environment.
    ///
    /// An explicit `config_file` must exist; the default location is
    /// optional.
    pub fn load(config_file: Option<&PathBuf>) -> anyhow::Result<Self> {
        let (path, required) = match config_file {
            Some(path) => (path.clone(), true),
            None => (Self::config_path(), false),
        };
        Self::load_from(&path, required)
    }

    fn load_from(path: &Path, required: bool) -> anyhow::Result<Self> {
        let defaults = Config::try_from(&Self::default()).context("serialising built-in defaults")?;
        Config::builder()
            .add_source(defaults)
            .add_source(File::from(path).format(FileFormat::Toml).required(required))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("reading configuration from {}", path.display()))?
            .try_deserialize()
            .context("configuration has an unexpected shape")
    }

    /// Default configuration file, falling back to `.pocket.toml` in the
    /// current directory.
    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("com", "pocket", "pocket")
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".pocket.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_mirror_engine_settings() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.engine, Settings::default());
        assert_eq!(cfg.render.url, DEFAULT_PAGE_URL);
        assert!(!cfg.output.no_color);
    }

    #[test]
    fn missing_optional_file_gives_defaults() {
        let dir = std::env::temp_dir().join("pocket-config-test-missing");
        let cfg = AppConfig::load_from(&dir.join("none.toml"), false).unwrap();
        assert_eq!(cfg.engine.alert_missing_template, "Not Found");
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let path = PathBuf::from("/definitely/not/here/pocket.toml");
        assert!(AppConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn file_overrides_engine_fields() {
        let dir = std::env::temp_dir().join(format!("pocket-config-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        fs::write(
            &path,
            "[engine]\ndefault_delta = \"-\"\nlocking = false\n\n[render]\nurl = \"https://example.com/\"\n",
        )
        .unwrap();

        let cfg = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.engine.default_delta, "-");
        assert!(!cfg.engine.locking);
        assert!(!cfg.engine.routing);
        assert_eq!(cfg.render.url, "https://example.com/");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn config_path_is_not_empty() {
        assert!(!AppConfig::config_path().as_os_str().is_empty());
    }
}
