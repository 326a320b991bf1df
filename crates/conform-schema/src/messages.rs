//! # Message Registry
//!
//! Maps a failure-kind identifier to the function that renders its end-user
//! message. The table is built once per process and never mutated.
//!
//! Identifiers are the message names, not validator keywords: the normalizer
//! maps keyword `minItems` to message `minimumItems`, keyword `format` with
//! format `date-time` to message `timestamp`, and so on.

use std::collections::HashMap;
use std::sync::OnceLock;

use conform_core::nice_join_with;
use serde_json::Value;

/// Argument handed to a message formatter.
#[derive(Debug, Clone, Copy)]
pub enum MessageArg<'a> {
    /// The formatter takes no argument.
    None,
    /// A name: a JSON type, a regex source, a format name.
    Text(&'a str),
    /// A numeric bound exactly as the validator reported it.
    Limit(&'a Value),
    /// The allowed values of an `enum` constraint.
    Values(&'a [Value]),
    /// An HTTP status code.
    Status(u16),
}

/// A message formatter.
pub type Formatter = fn(MessageArg<'_>) -> String;

/// Read-only table of message formatters.
#[derive(Debug)]
pub struct MessageRegistry {
    formatters: HashMap<&'static str, Formatter>,
}

impl MessageRegistry {
    fn new() -> Self {
        let entries: [(&'static str, Formatter); 26] = [
            ("missing", |_| "must be present".to_string()),
            ("unknown", |_| "is not a valid property".to_string()),
            ("paramType", param_type),
            ("presentString", |_| "must be a non empty string".to_string()),
            ("minimum", |arg| {
                format!("must be a number greater than or equal to {}", limit_text(arg))
            }),
            ("maximum", |arg| {
                format!("must be a number less than or equal to {}", limit_text(arg))
            }),
            ("minimumProperties", minimum_properties),
            ("maximumProperties", maximum_properties),
            ("minimumItems", minimum_items),
            ("maximumItems", maximum_items),
            ("enum", one_of),
            ("pattern", pattern),
            ("invalidFormat", |arg| format!("must match format \"{}\" (format)", text(arg))),
            ("uuid", |_| "must be a valid GUID (UUID v4)".to_string()),
            ("timestamp", |_| {
                "must be a valid ISO 8601 / RFC 3339 timestamp (example: 2018-07-06T12:34:56Z)"
                    .to_string()
            }),
            ("date", |_| {
                "must be a valid ISO 8601 / RFC 3339 date (example: 2018-07-06)".to_string()
            }),
            ("time", |_| {
                "must be a valid ISO 8601 / RFC 3339 time (example: 12:34:56)".to_string()
            }),
            ("hostname", |_| "must be a valid hostname (example: www.example.com)".to_string()),
            ("ipv4", |_| "must be a valid IPv4 address (example: 192.168.0.1)".to_string()),
            ("ipv6", |_| "must be a valid IPv6 address (example: 2001:db8::1)".to_string()),
            ("uri", |_| "must be a valid URI (example: https://example.com/path)".to_string()),
            ("contentType", |_| {
                "only JSON payloads are accepted. Please set the \"Content-Type\" header to start with \"application/json\""
                    .to_string()
            }),
            ("json", |_| "the body payload is not a valid JSON".to_string()),
            ("jsonEmpty", |_| {
                "the JSON body payload cannot be empty if the \"Content-Type\" header is set"
                    .to_string()
            }),
            ("invalidResponseCode", |arg| {
                format!("This endpoint cannot respond with HTTP status {}.", status(arg))
            }),
            ("invalidResponse", |arg| {
                format!(
                    "The response returned from the endpoint violates its specification for the HTTP status {}.",
                    status(arg)
                )
            }),
        ];

        Self {
            formatters: entries.into_iter().collect(),
        }
    }

    /// Look up a formatter by identifier.
    pub fn get(&self, kind: &str) -> Option<Formatter> {
        self.formatters.get(kind).copied()
    }

    /// Whether a formatter is registered for `kind`.
    pub fn contains(&self, kind: &str) -> bool {
        self.formatters.contains_key(kind)
    }

    /// Render the message for `kind`, if a formatter exists.
    pub fn format(&self, kind: &str, arg: MessageArg<'_>) -> Option<String> {
        self.get(kind).map(|formatter| formatter(arg))
    }

    /// Registered identifiers, sorted.
    pub fn kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<&'static str> = self.formatters.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }
}

/// The process-wide registry.
pub fn registry() -> &'static MessageRegistry {
    static REGISTRY: OnceLock<MessageRegistry> = OnceLock::new();
    REGISTRY.get_or_init(MessageRegistry::new)
}

/// Render `kind` from the process-wide registry.
///
/// Unknown kinds yield an empty string. Use [`MessageRegistry::format`] when
/// the difference matters.
pub fn message(kind: &str, arg: MessageArg<'_>) -> String {
    registry().format(kind, arg).unwrap_or_default()
}

fn param_type(arg: MessageArg<'_>) -> String {
    let phrase = match text(arg) {
        "integer" => "must be a valid integer number",
        "number" => "must be a valid number",
        "boolean" => "must be a valid boolean (true or false)",
        "object" => "must be an object",
        "array" => "must be an array",
        _ => "must be a string",
    };
    phrase.to_string()
}

fn minimum_properties(arg: MessageArg<'_>) -> String {
    match count(arg) {
        Some(1) => "cannot be an empty object".to_string(),
        _ => format!("must be an object with at least {} properties", count_text(arg)),
    }
}

fn maximum_properties(arg: MessageArg<'_>) -> String {
    match count(arg) {
        Some(0) => "must be an empty object".to_string(),
        _ => format!("must be an object with at most {} properties", count_text(arg)),
    }
}

fn minimum_items(arg: MessageArg<'_>) -> String {
    match count(arg) {
        Some(1) => "cannot be an empty array".to_string(),
        _ => format!("must be an array with at least {} items", count_text(arg)),
    }
}

fn maximum_items(arg: MessageArg<'_>) -> String {
    match count(arg) {
        Some(0) => "must be an empty array".to_string(),
        _ => format!("must be an array with at most {} items", count_text(arg)),
    }
}

fn one_of(arg: MessageArg<'_>) -> String {
    let values: &[Value] = match arg {
        MessageArg::Values(values) => values,
        _ => &[],
    };
    let quoted: Vec<String> = values
        .iter()
        .map(|value| match value {
            Value::String(s) => format!("\"{s}\""),
            other => format!("\"{other}\""),
        })
        .collect();
    format!(
        "must be one of the following values: {}",
        nice_join_with(&quoted, " or ", ", ")
    )
}

fn pattern(arg: MessageArg<'_>) -> String {
    format!("must match pattern \"{}\"", text(arg).replace("(?:", "("))
}

fn text(arg: MessageArg<'_>) -> &str {
    match arg {
        MessageArg::Text(text) => text,
        _ => "",
    }
}

/// Item or property bound. Integral floats (`1.0`) count as integers.
fn count(arg: MessageArg<'_>) -> Option<u64> {
    match arg {
        MessageArg::Limit(limit) => limit.as_u64().or_else(|| {
            limit
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        _ => None,
    }
}

fn count_text(arg: MessageArg<'_>) -> String {
    count(arg).map_or_else(|| limit_text(arg), |n| n.to_string())
}

fn limit_text(arg: MessageArg<'_>) -> String {
    match arg {
        MessageArg::Limit(Value::String(s)) => s.clone(),
        MessageArg::Limit(limit) => limit.to_string(),
        MessageArg::Text(text) => text.to_string(),
        _ => String::new(),
    }
}

fn status(arg: MessageArg<'_>) -> String {
    match arg {
        MessageArg::Status(code) => code.to_string(),
        other => limit_text(other),
    }
}
