//! Dynamic JSON value helpers shared by injection, cloning and hydration.
//!
//! Stored data is arbitrary JSON, so every consumer needs the same three
//! operations: walk a path into a value ([`dig`]), turn a value into the text
//! painted into markup ([`display_value`]) and decide whether a value counts as
//! present ([`is_truthy`]).

use serde_json::Value;

/// Path segment that joins every element of an array.
pub const JOIN_ALL_SEGMENT: &str = "[n]";

/// Walk `path` into `value`.
///
/// The path is split on `,` when it contains one, else on `.`. Numeric
/// segments index arrays (and match numeric object keys). A `[n]` segment
/// against an array returns all elements joined with `", "`. A missing member
/// yields `None`; an empty path yields the value itself.
///
/// ```
/// use pocket_core::domain::dig;
/// use serde_json::json;
///
/// let news = json!({"categories": ["a", "b"], "billing": {"street": "Main"}});
/// assert_eq!(dig(&news, "billing.street"), Some(json!("Main")));
/// assert_eq!(dig(&news, "categories.1"), Some(json!("b")));
/// assert_eq!(dig(&news, "categories.[n]"), Some(json!("a, b")));
/// assert_eq!(dig(&news, "missing.path"), None);
/// ```
pub fn dig(value: &Value, path: &str) -> Option<Value> {
    if path.is_empty() {
        return Some(value.clone());
    }
    let delimiter = if path.contains(',') { ',' } else { '.' };
    let segments: Vec<&str> = path.split(delimiter).collect();
    dig_segments(value, &segments)
}

fn dig_segments(value: &Value, segments: &[&str]) -> Option<Value> {
    let Some((member, rest)) = segments.split_first() else {
        return Some(value.clone());
    };

    if *member == JOIN_ALL_SEGMENT {
        if let Value::Array(items) = value {
            let joined = items.iter().map(display_value).collect::<Vec<_>>().join(", ");
            return Some(Value::String(joined));
        }
    }

    let next = match value {
        Value::Array(items) => member.parse::<usize>().ok().and_then(|i| items.get(i)),
        Value::Object(map) => map.get(*member),
        _ => None,
    }?;

    if rest.is_empty() {
        Some(next.clone())
    } else {
        dig_segments(next, rest)
    }
}

/// Text painted into markup for a value.
///
/// Strings are used verbatim, whole floats print without a fraction, arrays
/// join their elements with `,` and objects serialise as JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(display_value).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// Whether a value counts as present for hydration and formatting.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Parse a string as JSON, yielding `None` on malformed input.
pub fn parse_json(raw: &str) -> Option<Value> {
    serde_json::from_str(raw).ok()
}

/// Keep only ASCII letters, as used for generated class names.
pub fn alpha_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_alphabetic()).collect()
}
