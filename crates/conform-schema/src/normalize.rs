//! # Validation Error Normalizer
//!
//! Turns raw validator failures into one human-readable message per
//! property, grouped under the section that was validated:
//!
//! ```text
//! { "body": { "name": "must be present", "items.2.qty": "must be a valid integer number" } }
//! ```
//!
//! ## Invariants
//!
//! - The output has exactly one key, the (aliased) section name.
//! - A property path maps to a single message. When several failures land on
//!   the same path, the last one in input order wins. Failures are not
//!   aggregated.
//! - Every failure yields a message. Kinds without a bespoke formatter fall
//!   back to the validator's own text, so new validator keywords degrade
//!   gracefully instead of erroring.
//! - Property keys are ordered, so repeated runs serialize identically.

use std::collections::BTreeMap;

use conform_core::path::unescape_pointer_token;
use conform_core::{capitalize, get, FailureKind, FailureRecord, Section};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::messages::{registry, MessageArg};

/// Key used for failures located at the document root.
pub const ROOT_KEY: &str = "$root";

/// Pattern that validators use to express "non-empty string".
const NON_EMPTY_PATTERN: &str = ".+";

/// Formats with a dedicated message in the registry.
const FORMAT_MESSAGES: [&str; 8] = ["uuid", "timestamp", "date", "time", "hostname", "ipv4", "ipv6", "uri"];

/// Per-property messages for one section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedErrors {
    section: Section,
    fields: BTreeMap<String, String>,
}

impl NormalizedErrors {
    /// An empty report for `section`.
    pub fn new(section: Section) -> Self {
        Self {
            section,
            fields: BTreeMap::new(),
        }
    }

    /// The section this report covers.
    pub fn section(&self) -> Section {
        self.section
    }

    /// Property path to message.
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Message recorded for `property`, if any.
    pub fn get(&self, property: &str) -> Option<&str> {
        self.fields.get(property).map(String::as_str)
    }

    /// Record a message, replacing any earlier one for the same property.
    pub fn insert(&mut self, property: impl Into<String>, message: impl Into<String>) {
        self.fields.insert(property.into(), message.into());
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `section.path: Message` lines, one per property.
    pub fn describe(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|(path, message)| format!("{}.{}: {}", self.section, path, capitalize(message)))
            .collect()
    }

    /// The `{ section: { path: message } }` JSON shape.
    pub fn to_value(&self) -> Value {
        let fields: Map<String, Value> = self
            .fields
            .iter()
            .map(|(path, message)| (path.clone(), Value::String(message.clone())))
            .collect();
        let mut out = Map::new();
        out.insert(self.section.as_str().to_string(), Value::Object(fields));
        Value::Object(out)
    }
}

impl Serialize for NormalizedErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.section.as_str(), &self.fields)?;
        map.end()
    }
}

/// Convert validator failures into per-property messages.
///
/// `data` is the document that was validated; it is consulted only to
/// special-case empty values failing the non-empty pattern.
pub fn normalize(section: Section, data: &Value, failures: &[FailureRecord]) -> NormalizedErrors {
    let mut errors = NormalizedErrors::new(section);
    for failure in failures {
        let (property, message) = convert(data, failure);
        errors.insert(property, message);
    }
    errors
}

fn convert(data: &Value, failure: &FailureRecord) -> (String, String) {
    let registry = registry();
    let mut key = clean_path(&failure.path);
    let mut pointer = failure.path.starts_with('/');

    let message = match failure.kind() {
        FailureKind::Required | FailureKind::Dependencies => {
            if let Some(property) = failure.param_str("missingProperty") {
                key = property.to_string();
                pointer = false;
            }
            registry.format("missing", MessageArg::None)
        }
        FailureKind::AdditionalProperties => {
            if let Some(property) = failure.param_str("additionalProperty") {
                key = property.to_string();
                pointer = false;
            }
            registry.format("unknown", MessageArg::None)
        }
        FailureKind::Type => {
            type_name(failure).and_then(|ty| registry.format("paramType", MessageArg::Text(ty)))
        }
        FailureKind::MinProperties => limit_message(failure, "minimumProperties"),
        FailureKind::MaxProperties => limit_message(failure, "maximumProperties"),
        FailureKind::MinItems => limit_message(failure, "minimumItems"),
        FailureKind::MaxItems => limit_message(failure, "maximumItems"),
        FailureKind::Minimum => limit_message(failure, "minimum"),
        FailureKind::Maximum => limit_message(failure, "maximum"),
        FailureKind::Enum => failure
            .param("allowedValues")
            .and_then(Value::as_array)
            .and_then(|values| registry.format("enum", MessageArg::Values(values))),
        FailureKind::Pattern => failure.param_str("pattern").and_then(|pattern| {
            if pattern == NON_EMPTY_PATTERN && is_falsy(get(data, &failure.path)) {
                registry.format("presentString", MessageArg::None)
            } else {
                registry.format("pattern", MessageArg::Text(pattern))
            }
        }),
        FailureKind::Format => failure.param_str("format").and_then(|format| {
            let name = if format == "date-time" { "timestamp" } else { format };
            if FORMAT_MESSAGES.contains(&name) {
                registry.format(name, MessageArg::None)
            } else {
                registry.format("invalidFormat", MessageArg::Text(name))
            }
        }),
        FailureKind::Other => None,
    };

    let message = message.unwrap_or_else(|| fallback_message(failure));
    (finalize_path(&key, pointer), message)
}

fn limit_message(failure: &FailureRecord, kind: &str) -> Option<String> {
    failure
        .param("limit")
        .and_then(|limit| registry().format(kind, MessageArg::Limit(limit)))
}

/// Expected type name. Multi-type constraints report their first type.
fn type_name(failure: &FailureRecord) -> Option<&str> {
    match failure.param("type")? {
        Value::String(ty) => ty.split(',').next(),
        Value::Array(types) => types.first().and_then(Value::as_str),
        _ => None,
    }
}

fn fallback_message(failure: &FailureRecord) -> String {
    let text = match failure.message.strip_prefix("should") {
        Some(rest) => format!("must{rest}"),
        None => failure.message.clone(),
    };
    format!("{text} ({})", failure.keyword)
}

fn is_falsy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => false,
    }
}

/// Drop one leading separator and one pair of brackets wrapping the whole path.
fn clean_path(path: &str) -> String {
    let path = path
        .strip_prefix('.')
        .or_else(|| path.strip_prefix('/'))
        .unwrap_or(path);
    match path.strip_prefix('[').and_then(|inner| inner.strip_suffix(']')) {
        Some(inner) => inner.to_string(),
        None => path.to_string(),
    }
}

/// Convert a cleaned path to its dotted output key.
///
/// `pointer` marks keys that came from a JSON Pointer, whose `/` separators
/// and `~` escapes need translating.
fn finalize_path(key: &str, pointer: bool) -> String {
    let key = if pointer {
        key.split('/')
            .map(unescape_pointer_token)
            .collect::<Vec<String>>()
            .join(".")
    } else {
        key.to_string()
    };

    let dotted = flatten_brackets(&key);
    let dotted = dotted.trim_start_matches('.');
    let dotted = strip_quotes(dotted);

    if dotted.is_empty() {
        ROOT_KEY.to_string()
    } else {
        dotted.to_string()
    }
}

/// `items[2]['name']` becomes `items.2.name`.
fn flatten_brackets(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut chars = key.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '[' {
            out.push(c);
            continue;
        }
        out.push('.');
        match chars.peek().copied() {
            Some(quote @ ('\'' | '"')) => {
                chars.next();
                while let Some(inner) = chars.next() {
                    if inner == quote && chars.peek() == Some(&']') {
                        chars.next();
                        break;
                    }
                    out.push(inner);
                }
            }
            _ => {
                for inner in chars.by_ref() {
                    if inner == ']' {
                        break;
                    }
                    out.push(inner);
                }
            }
        }
    }
    out
}

/// `'name'` becomes `name` when the whole key is quoted and holds no dot.
fn strip_quotes(key: &str) -> &str {
    for quote in ['\'', '"'] {
        if let Some(inner) = key.strip_prefix(quote).and_then(|rest| rest.strip_suffix(quote)) {
            if !inner.is_empty() && !inner.contains('.') {
                return inner;
            }
        }
    }
    key
}
