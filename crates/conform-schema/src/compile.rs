//! # Schema Compilation
//!
//! The schema compiler is a capability injected into the rest of the
//! workspace: anything that can turn a JSON Schema into a payload check can
//! drive the normalizer and the response contract. Two traits describe it:
//!
//! - [`SchemaCompiler`]: `compile(schema) -> validator`, invoked once per
//!   schema at registration time.
//! - [`PayloadValidator`]: `validate(payload) -> { valid, errors }`, invoked
//!   per request or response.
//!
//! [`JsonSchemaCompiler`] is the bundled implementation, backed by the
//! `jsonschema` crate (Draft 2020-12, format assertions enabled). It reports
//! failures in the `keyword` / `path` / `params` shape the normalizer reads.
//!
//! ## Thread Safety
//!
//! Both traits require `Send + Sync`: compiled validators are built before
//! serving and shared read-only across requests.

use conform_core::path::parse_path;
use conform_core::{FailureRecord, PathSegment};
use jsonschema::error::{TypeKind, ValidationErrorKind};
use jsonschema::{ValidationError, Validator};
use serde_json::{json, Value};
use thiserror::Error;

/// Error raised while compiling schemas or loading schema documents.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The schema itself is invalid and no validator could be built.
    #[error("schema compile error: {reason}")]
    Compile {
        /// Reason reported by the compiler.
        reason: String,
    },

    /// A response table key is not an HTTP status code.
    #[error("response schema key '{0}' is not an HTTP status code (expected 100-599)")]
    InvalidStatusKey(String),

    /// A schema or document file could not be read or parsed.
    #[error("document load error for '{path}': {reason}")]
    DocumentLoad {
        /// Path to the document that failed to load.
        path: String,
        /// Reason the document could not be loaded.
        reason: String,
    },
}

/// Result of running one payload through a compiled validator.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub errors: Vec<FailureRecord>,
}

impl ValidationOutcome {
    /// A passing outcome.
    pub fn valid() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    /// A failing outcome. An empty `errors` list still counts as invalid.
    pub fn invalid(errors: Vec<FailureRecord>) -> Self {
        Self { valid: false, errors }
    }
}

/// A compiled schema.
pub trait PayloadValidator: Send + Sync {
    /// Check `payload` against the compiled schema.
    fn validate(&self, payload: &Value) -> ValidationOutcome;
}

impl<F> PayloadValidator for F
where
    F: Fn(&Value) -> ValidationOutcome + Send + Sync,
{
    fn validate(&self, payload: &Value) -> ValidationOutcome {
        self(payload)
    }
}

/// Turns a JSON Schema into a [`PayloadValidator`].
pub trait SchemaCompiler: Send + Sync {
    /// Compile `schema` once; the result is reused for every payload.
    fn compile(&self, schema: &Value) -> Result<Box<dyn PayloadValidator>, SchemaError>;
}

impl<F> SchemaCompiler for F
where
    F: Fn(&Value) -> Result<Box<dyn PayloadValidator>, SchemaError> + Send + Sync,
{
    fn compile(&self, schema: &Value) -> Result<Box<dyn PayloadValidator>, SchemaError> {
        self(schema)
    }
}

/// [`SchemaCompiler`] backed by the `jsonschema` crate.
#[derive(Debug, Clone, Default)]
pub struct JsonSchemaCompiler {
    _private: (),
}

impl JsonSchemaCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile to the concrete validator type.
    pub fn build(&self, schema: &Value) -> Result<JsonSchemaValidator, SchemaError> {
        let mut opts = jsonschema::options();
        opts.with_draft(jsonschema::Draft::Draft202012);
        opts.should_validate_formats(true);

        let validator = opts.build(schema).map_err(|e| SchemaError::Compile {
            reason: e.to_string(),
        })?;

        Ok(JsonSchemaValidator { validator })
    }
}

impl SchemaCompiler for JsonSchemaCompiler {
    fn compile(&self, schema: &Value) -> Result<Box<dyn PayloadValidator>, SchemaError> {
        Ok(Box::new(self.build(schema)?))
    }
}

/// A schema compiled by [`JsonSchemaCompiler`].
pub struct JsonSchemaValidator {
    validator: Validator,
}

impl std::fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSchemaValidator").finish_non_exhaustive()
    }
}

impl PayloadValidator for JsonSchemaValidator {
    fn validate(&self, payload: &Value) -> ValidationOutcome {
        let errors: Vec<FailureRecord> = self
            .validator
            .iter_errors(payload)
            .flat_map(|error| self.failure_records(&error))
            .collect();

        if errors.is_empty() {
            ValidationOutcome::valid()
        } else {
            ValidationOutcome::invalid(errors)
        }
    }
}

impl JsonSchemaValidator {
    /// Translate one `jsonschema` error into failure records.
    ///
    /// Usually one record per error; `additionalProperties` yields one record
    /// per unexpected member.
    fn failure_records(&self, error: &ValidationError<'_>) -> Vec<FailureRecord> {
        let path = error.instance_path.to_string();
        let schema_path = error.schema_path.to_string();
        let message = error.to_string();
        let record = |keyword: &str| FailureRecord::new(keyword, path.clone(), message.clone());

        let failure = match &error.kind {
            ValidationErrorKind::Required { property } => {
                let name = match property {
                    Value::String(name) => name.clone(),
                    other => other.to_string(),
                };
                record("required").with_param("missingProperty", child_path(&path, &name))
            }
            ValidationErrorKind::AdditionalProperties { unexpected } => {
                return unexpected
                    .iter()
                    .map(|name| {
                        record("additionalProperties")
                            .with_param("additionalProperty", child_path(&path, name))
                    })
                    .collect();
            }
            ValidationErrorKind::Type { kind } => record("type").with_param("type", expected_type(kind)),
            ValidationErrorKind::Minimum { limit } => record("minimum").with_param("limit", limit.clone()),
            ValidationErrorKind::Maximum { limit } => record("maximum").with_param("limit", limit.clone()),
            ValidationErrorKind::MinProperties { limit } => {
                record("minProperties").with_param("limit", json!(limit))
            }
            ValidationErrorKind::MaxProperties { limit } => {
                record("maxProperties").with_param("limit", json!(limit))
            }
            ValidationErrorKind::MinItems { limit } => record("minItems").with_param("limit", json!(limit)),
            ValidationErrorKind::MaxItems { limit } => record("maxItems").with_param("limit", json!(limit)),
            ValidationErrorKind::Enum { options } => {
                let allowed = match options {
                    Value::Array(values) => Value::Array(values.clone()),
                    other => Value::Array(vec![other.clone()]),
                };
                record("enum").with_param("allowedValues", allowed)
            }
            ValidationErrorKind::Pattern { pattern } => {
                record("pattern").with_param("pattern", pattern.clone())
            }
            ValidationErrorKind::Format { format } => record("format").with_param("format", format.clone()),
            _ => record(schema_keyword(&schema_path)),
        };
        vec![failure]
    }
}

/// Expected type name(s) as reported by the validator. With several
/// allowed types `null` goes last, since the first name picks the message.
fn expected_type(kind: &TypeKind) -> Value {
    match kind {
        TypeKind::Single(ty) => Value::String(ty.to_string()),
        TypeKind::Multiple(types) => {
            let (mut names, nulls): (Vec<String>, Vec<String>) = types
                .clone()
                .into_iter()
                .map(|ty| ty.to_string())
                .partition(|name| name != "null");
            names.extend(nulls);
            Value::Array(names.into_iter().map(Value::String).collect())
        }
    }
}

/// Last segment of a schema path, which names the failing keyword.
fn schema_keyword(schema_path: &str) -> &str {
    schema_path.rsplit('/').next().unwrap_or(schema_path)
}

/// Dotted path of member `name` under the object at `parent` (a JSON Pointer).
fn child_path(parent: &str, name: &str) -> String {
    let mut segments: Vec<String> = parse_path(parent)
        .into_iter()
        .map(|segment| match segment {
            PathSegment::Key(key) => key,
            PathSegment::Index(index) => index.to_string(),
        })
        .collect();
    segments.push(name.to_string());
    segments.join(".")
}
