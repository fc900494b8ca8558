//! Placeholder substitution: injection against named data and per-record
//! cloning.

use serde_json::Value;

use crate::application::hooks::{CloneArgs, Hooks};
use crate::application::services::formatting::Formatting;
use crate::domain::{dig, display_value, placeholder, Augment, Placeholder, PlaceholderKind};

/// Named data source for injection.
pub trait DataLookup {
    fn lookup(&self, key: &str) -> Option<Value>;
}

impl<F> DataLookup for F
where
    F: Fn(&str) -> Option<Value>,
{
    fn lookup(&self, key: &str) -> Option<Value> {
        self(key)
    }
}

fn resolve_text(value: Option<Value>, default_delta: &str) -> String {
    match value {
        None | Some(Value::Null) => default_delta.to_string(),
        Some(v) => display_value(&v),
    }
}

/// Single-pass substitution of `{{data:key:path:format:clue}}` tokens.
///
/// Other token types are left in place for the cloner.
pub struct Injector<'a> {
    lookup: &'a dyn DataLookup,
    formatting: &'a Formatting,
    default_delta: &'a str,
}

impl<'a> Injector<'a> {
    pub fn new(lookup: &'a dyn DataLookup, formatting: &'a Formatting, default_delta: &'a str) -> Self {
        Self {
            lookup,
            formatting,
            default_delta,
        }
    }

    pub fn inject(&self, template: &str) -> String {
        let mut out = template.to_string();
        for body in placeholder::scan_sorted(template) {
            let token = Placeholder::parse(body);
            if token.kind() != PlaceholderKind::Data {
                continue;
            }
            let value = token
                .arg(1)
                .and_then(|key| self.lookup.lookup(key))
                .and_then(|data| dig(&data, token.arg(2).unwrap_or_default()));
            let value = match (value, token.arg(3)) {
                (Some(v), Some(formats)) if !v.is_null() => {
                    Some(self.formatting.apply(v, formats, token.arg(4)))
                }
                (v, _) => v,
            };
            out = out.replace(&token.token(), &resolve_text(value, self.default_delta));
        }
        out
    }
}

/// Per-record expansion of a fragment.
pub struct Cloner<'a> {
    formatting: &'a Formatting,
    hooks: &'a Hooks,
    default_delta: &'a str,
    unknown_type_alert: &'a str,
}

impl<'a> Cloner<'a> {
    pub fn new(
        formatting: &'a Formatting,
        hooks: &'a Hooks,
        default_delta: &'a str,
        unknown_type_alert: &'a str,
    ) -> Self {
        Self {
            formatting,
            hooks,
            default_delta,
            unknown_type_alert,
        }
    }

    /// One copy of `fragment` per record, space-joined.
    ///
    /// Tokens are processed in sorted order, the same for every record.
    pub fn expand(&self, records: &[Value], fragment: &str) -> String {
        let bodies = placeholder::scan_sorted(fragment);
        records
            .iter()
            .enumerate()
            .map(|(index, record)| self.expand_one(index, record, fragment, &bodies))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn expand_one(&self, index: usize, record: &Value, fragment: &str, bodies: &[&str]) -> String {
        let mut out = fragment.to_string();

        for body in bodies {
            let token = Placeholder::parse(body);
            let (format, clue) = (token.arg(2), token.arg(3));

            let value = match token.kind() {
                PlaceholderKind::Record => dig(record, token.arg(1).unwrap_or_default()),
                PlaceholderKind::Augment => {
                    let args = || CloneArgs {
                        str1: format.map(str::to_string),
                        str2: clue.map(str::to_string),
                        index,
                        placeholder: token.token(),
                        clone_str: fragment.to_string(),
                        cloning_str: out.clone(),
                    };
                    match token.arg(1).and_then(Augment::parse) {
                        Some(Augment::Index) => Some(Value::from(index)),
                        Some(Augment::Count) => Some(Value::from(index + 1)),
                        Some(Augment::Value) => self.hooks.run_clone_value(record, &args()),
                        Some(Augment::String) => {
                            if let Some(rewritten) = self.hooks.run_clone_string(record, &args()) {
                                out = rewritten;
                            }
                            None
                        }
                        None => None,
                    }
                }
                PlaceholderKind::Data | PlaceholderKind::Unknown => Some(Value::String(format!(
                    "{} '{}'",
                    self.unknown_type_alert,
                    token.type_name()
                ))),
            };

            let value = match (value, format) {
                (Some(v), Some(formats)) if !v.is_null() => Some(self.formatting.apply(v, formats, clue)),
                (v, _) => v,
            };
            out = out.replace(&token.token(), &resolve_text(value, self.default_delta));
        }

        out
    }
}
