//! Double-curly placeholder grammar: `{{type:arg1:arg2:...}}`.
//!
//! Injection consumes `data` / `@` placeholders against named stored data;
//! cloning consumes the per-record kinds (`rec` / `#`, `aug` / `!`). Anything
//! else is left in the markup untouched by injection so the cloner still finds
//! it.

use std::fmt;

/// Opening delimiter of a placeholder.
pub const OPEN: &str = "{{";
/// Closing delimiter of a placeholder.
pub const CLOSE: &str = "}}";

/// Find every placeholder body in `template`, in order of appearance.
///
/// Duplicates are kept. A body never contains `{`, so `{{{x}}` yields `x`.
pub fn scan(template: &str) -> Vec<&str> {
    let bytes = template.as_bytes();
    let mut found = Vec::new();
    let mut cursor = 0;

    while let Some(rel) = template[cursor..].find(OPEN) {
        // Skip runs of braces so the body starts after the last `{`.
        let mut start = cursor + rel + OPEN.len();
        while start < bytes.len() && bytes[start] == b'{' {
            start += 1;
        }
        let Some(close_rel) = template[start..].find(CLOSE) else {
            break;
        };
        let end = start + close_rel;
        let body = &template[start..end];
        if let Some(brace) = body.find('{') {
            cursor = start + brace;
            continue;
        }
        if !body.is_empty() {
            found.push(body);
        }
        cursor = end + CLOSE.len();
    }

    found
}

/// Sorted, deduplicated placeholder bodies, as the cloner processes them.
pub fn scan_sorted(template: &str) -> Vec<&str> {
    let mut bodies = scan(template);
    bodies.sort_unstable();
    bodies.dedup();
    bodies
}

/// Wrap a body back into its delimiters.
pub fn wrap(body: &str) -> String {
    format!("{OPEN}{body}{CLOSE}")
}

/// The kind named by a placeholder's first segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    /// `data` / `@` names stored data.
    Data,
    /// `rec` / `#` reads the current clone record.
    Record,
    /// `aug` / `!` covers position and user hooks during cloning.
    Augment,
    /// Anything else.
    Unknown,
}

impl PlaceholderKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "data" | "@" => Self::Data,
            "rec" | "#" => Self::Record,
            "aug" | "!" => Self::Augment,
            _ => Self::Unknown,
        }
    }
}

/// Members understood by `aug` placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Augment {
    /// Zero-based position.
    Index,
    /// One-based position.
    Count,
    /// Value computed by the `clone_value` hook.
    Value,
    /// Fragment rewrite by the `clone_string` hook.
    String,
}

impl Augment {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "i" | "index" => Some(Self::Index),
            "c" | "count" => Some(Self::Count),
            "v" | "val" | "value" => Some(Self::Value),
            "s" | "str" | "string" => Some(Self::String),
            _ => None,
        }
    }
}

/// A placeholder body split into its `:` segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder<'a> {
    body: &'a str,
    segments: Vec<&'a str>,
}

impl<'a> Placeholder<'a> {
    pub fn parse(body: &'a str) -> Self {
        Self {
            body,
            segments: body.split(':').collect(),
        }
    }

    /// Text between the delimiters.
    pub fn body(&self) -> &'a str {
        self.body
    }

    /// Raw first segment.
    pub fn type_name(&self) -> &'a str {
        self.segments.first().copied().unwrap_or_default()
    }

    pub fn kind(&self) -> PlaceholderKind {
        PlaceholderKind::parse(self.type_name())
    }

    /// Segment `index` (0 is the type), `None` when absent or empty.
    pub fn arg(&self, index: usize) -> Option<&'a str> {
        self.segments.get(index).copied().filter(|s| !s.is_empty())
    }

    /// The full token as it appears in markup.
    pub fn token(&self) -> String {
        wrap(self.body)
    }
}

impl fmt::Display for Placeholder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{OPEN}{}{CLOSE}", self.body)
    }
}
