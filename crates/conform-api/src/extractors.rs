//! # Request Extractors
//!
//! Turn request sections into JSON values and run them through injected
//! section validators. Every rejection here is an [`AppError::Validation`]
//! carrying normalized per-property messages.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::{FromRequest, Query, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Uri};
use conform_core::Section;
use conform_schema::{message, normalize, MessageArg, NormalizedErrors, PayloadValidator, ROOT_KEY};
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::middleware::metrics::record_request_validation_failure;

/// Validate one request section, mapping failures to a 400.
pub fn check_section(
    section: Section,
    validator: &dyn PayloadValidator,
    value: &Value,
) -> Result<(), AppError> {
    let outcome = validator.validate(value);
    if outcome.valid {
        return Ok(());
    }
    Err(rejection(normalize(section, value, &outcome.errors)))
}

fn rejection(errors: NormalizedErrors) -> AppError {
    record_request_validation_failure(errors.section());
    tracing::debug!(failures = ?errors.describe(), "request validation failed");
    AppError::Validation(errors)
}

/// A body rejected before schema validation: `body.$root` gets `kind`'s message.
fn body_rejection(kind: &str) -> AppError {
    let mut errors = NormalizedErrors::new(Section::Body);
    errors.insert(ROOT_KEY, message(kind, MessageArg::None));
    rejection(errors)
}

/// JSON request body.
///
/// A body is accepted only with a `Content-Type` starting with
/// `application/json`. A request with neither body nor content type yields
/// `null`.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonBody(pub Value);

impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .map(|value| value.to_str().unwrap_or_default().trim().to_ascii_lowercase());

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        parse_json_body(content_type.as_deref(), &bytes).map(JsonBody)
    }
}

fn parse_json_body(content_type: Option<&str>, bytes: &[u8]) -> Result<Value, AppError> {
    match content_type {
        None if bytes.is_empty() => Ok(Value::Null),
        Some(ct) if ct.starts_with("application/json") => {
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Err(body_rejection("jsonEmpty"));
            }
            serde_json::from_slice(bytes).map_err(|_| body_rejection("json"))
        }
        _ => Err(body_rejection("contentType")),
    }
}

/// Query string as an object of strings. Repeated keys keep the last value.
pub fn query_value(uri: &Uri) -> Value {
    let pairs = Query::<Vec<(String, String)>>::try_from_uri(uri)
        .map(|Query(pairs)| pairs)
        .unwrap_or_default();
    let object: Map<String, Value> = pairs
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    Value::Object(object)
}

/// Matched path parameters as an object of strings.
pub fn params_value<'a>(params: impl IntoIterator<Item = (&'a str, &'a str)>) -> Value {
    let object: Map<String, Value> = params
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect();
    Value::Object(object)
}

/// Headers as an object keyed by lowercase name. Repeated headers are joined
/// with `", "`; values that are not visible ASCII are skipped.
pub fn headers_value(headers: &HeaderMap) -> Value {
    let mut joined: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            joined.entry(name.as_str()).or_default().push(value);
        }
    }
    let object: Map<String, Value> = joined
        .into_iter()
        .map(|(name, values)| (name.to_string(), Value::String(values.join(", "))))
        .collect();
    Value::Object(object)
}
