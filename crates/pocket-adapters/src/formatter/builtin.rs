//! The stock set of named value formats.

use serde_json::{Number, Value};

use pocket_core::application::ports::ValueFormatter;
use pocket_core::domain::{alpha_only, display_value, is_truthy};

const DEFAULT_TRUNCATE_MARKER: &str = "...";

/// Characters `encodeURI` leaves alone besides the unreserved set.
const URI_RESERVED: &str = ";,/?:@&=+$#";

/// Formats understood by [`BuiltinFormatter`].
pub const FORMATS: &[&str] = &[
    "alphaonly",
    "array",
    "boolean",
    "core_pk_attr",
    "decimal",
    "email",
    "emaillink",
    "encodeuri",
    "encodeuricomponent",
    "encrypt",
    "fax",
    "float",
    "imgsrc",
    "linkify",
    "lower",
    "money",
    "nohtml",
    "nospace",
    "null",
    "number",
    "numonly",
    "padleft",
    "padright",
    "phone",
    "removehtml",
    "string",
    "tinyhash",
    "truncate",
    "upper",
    "upperfirst",
    "urllink",
    "wrap",
];

/// Format names are case-insensitive. Unknown names pass the value
/// through untouched; known ones that produce `null` or an empty string
/// yield the default delta instead.
#[derive(Debug, Clone)]
pub struct BuiltinFormatter {
    default_delta: String,
    truncate_marker: String,
}

impl Default for BuiltinFormatter {
    fn default() -> Self {
        Self {
            default_delta: String::new(),
            truncate_marker: DEFAULT_TRUNCATE_MARKER.into(),
        }
    }
}

impl BuiltinFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_delta(mut self, delta: impl Into<String>) -> Self {
        self.default_delta = delta.into();
        self
    }

    pub fn with_truncate_marker(mut self, marker: impl Into<String>) -> Self {
        self.truncate_marker = marker.into();
        self
    }

    pub fn supports(format: &str) -> bool {
        FORMATS.contains(&format.to_ascii_lowercase().as_str())
    }
}

fn text(s: impl Into<String>) -> Value {
    Value::String(s.into())
}

fn to_f64(s: &str) -> f64 {
    s.trim().parse().unwrap_or(0.0)
}

fn float_chars(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect()
}

fn digits(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `count|pad` with the JavaScript defaults of `4|0`.
fn pad_clue(clue: Option<&str>) -> (usize, char) {
    let (count, pad) = clue.unwrap_or("4|0").split_once('|').unwrap_or((clue.unwrap_or("4"), "0"));
    (
        count.trim().parse().unwrap_or(0),
        pad.chars().next().unwrap_or(' '),
    )
}

fn pad(s: &str, width: usize, fill: char, left: bool) -> String {
    let len = s.chars().count();
    if len >= width {
        return s.to_string();
    }
    let padding: String = std::iter::repeat_n(fill, width - len).collect();
    if left {
        format!("{padding}{s}")
    } else {
        format!("{s}{padding}")
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

fn encode_uri(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || "-_.!~*'()".contains(c) || URI_RESERVED.contains(c) {
                c.to_string()
            } else {
                urlencoding::encode(c.encode_utf8(&mut [0; 4])).into_owned()
            }
        })
        .collect()
}

fn linkify(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            if word.starts_with("http://") || word.starts_with("https://") {
                format!(r#"<a href="{word}" target="_blank">{word}</a>"#)
            } else {
                word.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn phone(s: &str) -> String {
    let d = digits(s);
    if d.len() == 10 {
        format!("({}) {}-{}", &d[..3], &d[3..6], &d[6..])
    } else {
        s.to_string()
    }
}

/// Small rolling hash over UTF-16 code units, in hex.
fn tiny_hash(s: &str) -> String {
    let mut units = s.encode_utf16().map(i32::from);
    let Some(first) = units.next() else {
        return String::new();
    };
    let hash = units.fold(first, |a, v| {
        a.wrapping_add(a.wrapping_shl(7).wrapping_add(a.wrapping_shl(3))) ^ v
    });
    if hash < 0 {
        format!("-{:x}", i64::from(hash).abs())
    } else {
        format!("{hash:x}")
    }
}

impl ValueFormatter for BuiltinFormatter {
    fn format(&self, value: &Value, format: &str, clue: Option<&str>) -> Value {
        let s = display_value(value);
        let attrs = clue.unwrap_or_default();

        let out = match format.to_ascii_lowercase().as_str() {
            "upper" => text(s.to_uppercase()),
            "lower" | "email" => text(s.to_lowercase()),
            "upperfirst" => text(upper_first(&s)),
            "string" => text(s),
            "boolean" => Value::Bool(is_truthy(value) && s != "0" && !s.eq_ignore_ascii_case("false")),
            "decimal" => text(format!("{:.2}{}", to_f64(&s), attrs)),
            "money" => {
                let symbol = if matches!(clue, Some("USD" | "$")) { "$" } else { "" };
                text(format!("{symbol}{:.2}", to_f64(&s)))
            }
            "padleft" | "padright" => {
                let (width, fill) = pad_clue(clue);
                text(pad(&s, width, fill, format.eq_ignore_ascii_case("padleft")))
            }
            "truncate" => match clue.and_then(|c| c.trim().parse::<usize>().ok()) {
                Some(limit) if s.chars().count() >= limit => {
                    let head: String = s.chars().take(limit).collect();
                    text(format!("{head}{}", self.truncate_marker))
                }
                _ => text(s),
            },
            "wrap" => {
                let (open, close) = clue.and_then(|c| c.split_once('|')).unwrap_or(("", ""));
                if is_truthy(value) {
                    text(format!("{open}{s}{close}"))
                } else {
                    value.clone()
                }
            }
            "nospace" => text(s.replace(' ', "")),
            "numonly" => text(digits(&s)),
            "alphaonly" => text(alpha_only(&s)),
            "float" => text(float_chars(&s)),
            "number" => float_chars(&s)
                .parse::<f64>()
                .ok()
                .filter(|n| *n != 0.0)
                .and_then(Number::from_f64)
                .map_or(Value::Null, Value::Number),
            "nohtml" => text(escape_html(&s)),
            "removehtml" => text(strip_tags(&s)),
            "encodeuricomponent" => text(urlencoding::encode(&s).into_owned()),
            "encodeuri" => text(encode_uri(&s)),
            "emaillink" => {
                let email = s.to_lowercase();
                text(format!(r#"<a href="mailto:{email}" {attrs}>{email}</a>"#))
            }
            "urllink" => text(format!(r#"<a href="{s}" target="_blank" {attrs}>{s}</a>"#)),
            "imgsrc" => text(format!(r#"<img src="{s}" {attrs}>"#)),
            "linkify" => text(linkify(&s)),
            "phone" | "fax" => text(phone(&s)),
            "tinyhash" => text(tiny_hash(&s)),
            "encrypt" => {
                let mut chars: Vec<char> = s.chars().collect();
                chars.sort_unstable_by(|a, b| b.cmp(a));
                text(chars.into_iter().collect::<String>())
            }
            "null" => Value::Null,
            "core_pk_attr" => text(format!(r#" {attrs}="{s}" "#)),
            "array" => match value {
                Value::Object(map) => Value::Array(map.values().cloned().collect()),
                other => other.clone(),
            },
            _ => return value.clone(),
        };

        match &out {
            Value::Null => text(self.default_delta.clone()),
            Value::String(s) if s.is_empty() => text(self.default_delta.clone()),
            _ => out,
        }
    }
}
