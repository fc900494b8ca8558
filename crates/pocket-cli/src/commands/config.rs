//! `pocket config`: inspect configuration values.

use serde_json::Value;

use pocket_core::domain::{dig, display_value};

use crate::{
    cli::ConfigCommands,
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};

pub fn execute(cmd: ConfigCommands, config: AppConfig, output: OutputManager) -> CliResult<()> {
    match cmd {
        ConfigCommands::Get { key } => {
            let value = get_config_value(&config, &key)?;
            output.print(&value)?;
        }

        ConfigCommands::List => {
            output.header("Current Configuration:")?;
            let serialised = toml::to_string_pretty(&config).map_err(|e| CliError::ConfigError {
                message: format!("Failed to serialise config: {e}"),
                source: Some(Box::new(e)),
            })?;
            output.print(&serialised)?;
        }

        ConfigCommands::Path => {
            output.print(&AppConfig::config_path().display().to_string())?;
        }
    }

    Ok(())
}

// ── helpers ───────────────────────────────────────────────────────────────────

/// Look up a dotted path in the effective configuration.
fn get_config_value(config: &AppConfig, key: &str) -> CliResult<String> {
    let tree = serde_json::to_value(config).map_err(|e| CliError::ConfigError {
        message: format!("Failed to serialise config: {e}"),
        source: Some(Box::new(e)),
    })?;
    match dig(&tree, key) {
        Some(Value::Null) | None => Err(CliError::ConfigError {
            message: format!("Unknown or unset config key: '{key}'"),
            source: None,
        }),
        Some(value) => Ok(display_value(&value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_engine_key() {
        let cfg = AppConfig::default();
        assert_eq!(get_config_value(&cfg, "engine.alert_missing_template").unwrap(), "Not Found");
        assert_eq!(get_config_value(&cfg, "engine.locking").unwrap(), "true");
    }

    #[test]
    fn get_render_key() {
        let cfg = AppConfig::default();
        assert_eq!(get_config_value(&cfg, "render.url").unwrap(), "http://localhost/");
    }

    #[test]
    fn unset_and_unknown_keys_are_errors() {
        let cfg = AppConfig::default();
        assert!(matches!(
            get_config_value(&cfg, "does.not.exist"),
            Err(CliError::ConfigError { .. })
        ));
        assert!(get_config_value(&cfg, "render.session").is_err());
    }
}
