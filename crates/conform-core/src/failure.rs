//! # Failure Records
//!
//! A [`FailureRecord`] is one constraint violation exactly as the schema
//! validator reported it. Records are immutable inputs: normalization reads
//! them and never rewrites them.
//!
//! The record shape follows the widely used `keyword` / `path` / `params` /
//! `message` convention, so validators other than the bundled one can feed
//! the normalizer by producing the same fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConformError;

/// One raw validator failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Failure-kind identifier, e.g. `required`, `pattern`, `minimum`.
    pub keyword: String,
    /// Pointer into the validated document. Empty means the root.
    #[serde(default, alias = "instancePath", alias = "dataPath")]
    pub path: String,
    /// Kind-specific parameters (`missingProperty`, `limit`, `allowedValues`, ...).
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Generic message from the validator, used when no bespoke message applies.
    #[serde(default)]
    pub message: String,
}

impl FailureRecord {
    /// Create a record with no parameters.
    pub fn new(keyword: impl Into<String>, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            path: path.into(),
            params: Map::new(),
            message: message.into(),
        }
    }

    /// Builder-style parameter insertion.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Parse one record from a JSON value.
    pub fn from_value(value: Value) -> Result<Self, ConformError> {
        serde_json::from_value(value).map_err(|e| ConformError::InvalidFailureRecord(e.to_string()))
    }

    /// The parsed failure kind.
    pub fn kind(&self) -> FailureKind {
        FailureKind::from_keyword(&self.keyword)
    }

    /// Raw parameter lookup.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Parameter lookup for string-valued parameters.
    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(Value::as_str)
    }
}

/// The failure kinds that receive a bespoke message.
///
/// Anything the validator reports outside this set is [`FailureKind::Other`]
/// and is rendered from the record's generic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Required,
    Dependencies,
    AdditionalProperties,
    Type,
    MinProperties,
    MaxProperties,
    MinItems,
    MaxItems,
    Minimum,
    Maximum,
    Enum,
    Pattern,
    Format,
    Other,
}

impl FailureKind {
    /// Map a validator keyword onto a kind.
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword {
            "required" => Self::Required,
            "dependencies" => Self::Dependencies,
            "additionalProperties" => Self::AdditionalProperties,
            "type" => Self::Type,
            "minProperties" => Self::MinProperties,
            "maxProperties" => Self::MaxProperties,
            "minItems" => Self::MinItems,
            "maxItems" => Self::MaxItems,
            "minimum" => Self::Minimum,
            "maximum" => Self::Maximum,
            "enum" => Self::Enum,
            "pattern" => Self::Pattern,
            "format" => Self::Format,
            _ => Self::Other,
        }
    }
}
