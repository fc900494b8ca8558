//! Format pipelines: `upper|truncate*20` style chains over the formatter port.

use std::sync::Arc;

use serde_json::Value;

use crate::application::hooks::Hooks;
use crate::application::ports::ValueFormatter;

/// Delimiter between formats in a chain.
pub const FORMAT_DELIMITER: char = '|';
/// Delimiter between a format name and its own clue.
pub const CLUE_DELIMITER: char = '*';

/// Applies format chains through the [`ValueFormatter`] port, then the
/// `format_value` hook after every step.
#[derive(Clone)]
pub struct Formatting {
    formatter: Arc<dyn ValueFormatter>,
    hooks: Hooks,
}

impl Formatting {
    pub fn new(formatter: Arc<dyn ValueFormatter>, hooks: Hooks) -> Self {
        Self { formatter, hooks }
    }

    /// Run `value` through each format in `formats`.
    ///
    /// A step written `name*clue` uses its own clue in place of `clue`.
    pub fn apply(&self, value: Value, formats: &str, clue: Option<&str>) -> Value {
        formats
            .split(FORMAT_DELIMITER)
            .filter(|item| !item.is_empty())
            .fold(value, |value, item| {
                let (name, own_clue) = match item.split_once(CLUE_DELIMITER) {
                    Some((name, c)) if !c.is_empty() => (name, Some(c)),
                    Some((name, _)) => (name, clue),
                    None => (item, clue),
                };
                let value = self.formatter.format(&value, name, own_clue);
                self.hooks.run_format_value(value, formats, clue)
            })
    }
}
