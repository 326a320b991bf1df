//! # Route Manifest
//!
//! A YAML or JSON document describing routes to serve as a contract-checked
//! stub API. Each route declares request section schemas, per-status
//! response schemas, and a canned reply:
//!
//! ```yaml
//! routes:
//!   - method: GET
//!     path: /users/{id}
//!     request:
//!       params:
//!         type: object
//!         properties: { id: { type: string, pattern: "^[0-9]+$" } }
//!     responses:
//!       200:
//!         type: object
//!         required: [id, name]
//!     reply:
//!       status: 200
//!       body: { id: 1, name: Ada }
//! ```
//!
//! Requests are checked section by section (`params`, `body`, `query`,
//! `headers`); the first failing section is reported. The reply then passes
//! through the route's response contract, so a manifest whose reply breaks
//! its own contract answers with `INVALID_RESPONSE` or
//! `INVALID_RESPONSE_CODE`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use axum::extract::{FromRequest, RawPathParams, Request};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{on, MethodFilter, MethodRouter};
use axum::{Json, RequestPartsExt, Router};
use conform_core::Section;
use conform_schema::{load_document, PayloadValidator, SchemaError};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::AppError;
use crate::extractors::{check_section, headers_value, params_value, query_value, JsonBody};
use crate::middleware::contract::ContractGuard;

/// Error loading or compiling a route manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error(transparent)]
    Load(#[from] SchemaError),

    #[error("invalid manifest: {0}")]
    Parse(String),

    #[error("route {index}: unsupported method '{method}'")]
    InvalidMethod { index: usize, method: String },

    #[error("route {index}: invalid path '{path}': {reason}")]
    InvalidPath {
        index: usize,
        path: String,
        reason: &'static str,
    },

    #[error("route {index}: {method} {path} is declared more than once")]
    DuplicateRoute {
        index: usize,
        method: String,
        path: String,
    },

    #[error("route {index}: reply status {status} is not a valid HTTP status")]
    InvalidReplyStatus { index: usize, status: u16 },

    #[error("route {index}: {method} {path}: {source}")]
    Compile {
        index: usize,
        method: String,
        path: String,
        #[source]
        source: SchemaError,
    },
}

/// Parsed route manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub routes: Vec<RouteSpec>,
}

/// One route of the manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteSpec {
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub request: RequestSchemas,
    #[serde(default)]
    pub responses: BTreeMap<String, Value>,
    #[serde(default)]
    pub reply: Reply,
}

/// Request section schemas.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestSchemas {
    #[serde(default, alias = "querystring")]
    pub query: Option<Value>,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub headers: Option<Value>,
    #[serde(default)]
    pub body: Option<Value>,
}

/// Canned reply. A missing body sends no content.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Reply {
    #[serde(default = "default_reply_status")]
    pub status: u16,
    #[serde(default)]
    pub body: Option<Value>,
}

impl Default for Reply {
    fn default() -> Self {
        Self {
            status: default_reply_status(),
            body: None,
        }
    }
}

fn default_reply_status() -> u16 {
    200
}

impl Manifest {
    /// Load a manifest from a `.json`, `.yaml` or `.yml` file.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        Self::from_value(load_document(path)?)
    }

    pub fn from_value(value: Value) -> Result<Self, ManifestError> {
        serde_json::from_value(value).map_err(|e| ManifestError::Parse(e.to_string()))
    }

    /// Compile every route into a router. Request and response schemas are
    /// compiled here, once; nothing is compiled per request.
    pub fn router(&self, guard: &ContractGuard) -> Result<Router, ManifestError> {
        let mut by_path: BTreeMap<&str, MethodRouter> = BTreeMap::new();
        let mut shapes: BTreeMap<String, &str> = BTreeMap::new();
        let mut seen: BTreeSet<(&str, String)> = BTreeSet::new();

        for (index, spec) in self.routes.iter().enumerate() {
            let method = parse_method(index, &spec.method)?;
            check_path(index, &spec.path)?;

            // `/a/{x}` and `/a/{y}` cannot share a router.
            let shape = path_shape(&spec.path);
            match shapes.get(&shape) {
                Some(existing) if *existing != spec.path => {
                    return Err(ManifestError::InvalidPath {
                        index,
                        path: spec.path.clone(),
                        reason: "parameter names conflict with another route",
                    });
                }
                Some(_) => {}
                None => {
                    shapes.insert(shape, spec.path.as_str());
                }
            }

            if !seen.insert((spec.path.as_str(), method.to_string())) {
                return Err(ManifestError::DuplicateRoute {
                    index,
                    method: method.to_string(),
                    path: spec.path.clone(),
                });
            }

            let compile_error = |source: SchemaError| ManifestError::Compile {
                index,
                method: method.to_string(),
                path: spec.path.clone(),
                source,
            };

            let stub = Arc::new(StubRoute::compile(spec, guard).map_err(|e| match e {
                StubError::Schema(source) => compile_error(source),
                StubError::Status(status) => ManifestError::InvalidReplyStatus { index, status },
            })?);

            let filter = method_filter(index, &method)?;
            let route = on(filter, move |request: Request| {
                let stub = Arc::clone(&stub);
                async move { stub.handle(request).await }
            });
            let route = guard.guard(route, &spec.responses).map_err(compile_error)?;

            let merged = match by_path.remove(spec.path.as_str()) {
                Some(existing) => existing.merge(route),
                None => route,
            };
            by_path.insert(spec.path.as_str(), merged);
        }

        Ok(by_path
            .into_iter()
            .fold(Router::new(), |router, (path, route)| router.route(path, route)))
    }
}

fn parse_method(index: usize, method: &str) -> Result<Method, ManifestError> {
    let invalid = || ManifestError::InvalidMethod {
        index,
        method: method.to_string(),
    };
    Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes()).map_err(|_| invalid())
}

fn method_filter(index: usize, method: &Method) -> Result<MethodFilter, ManifestError> {
    MethodFilter::try_from(method.clone()).map_err(|_| ManifestError::InvalidMethod {
        index,
        method: method.to_string(),
    })
}

/// Paths the service mounts itself.
const RESERVED_PATHS: [&str; 3] = ["/health/liveness", "/health/readiness", "/metrics"];

fn check_path(index: usize, path: &str) -> Result<(), ManifestError> {
    let invalid = |reason| ManifestError::InvalidPath {
        index,
        path: path.to_string(),
        reason,
    };
    if !path.starts_with('/') {
        return Err(invalid("must start with '/'"));
    }
    if RESERVED_PATHS.contains(&path) {
        return Err(invalid("reserved for the service itself"));
    }
    for segment in path.split('/').skip(1) {
        if segment.starts_with(':') || segment.starts_with('*') {
            return Err(invalid("use '{name}' for path parameters"));
        }
        let opens = segment.matches('{').count();
        let closes = segment.matches('}').count();
        if opens > 1 || opens != closes {
            return Err(invalid("at most one '{name}' parameter per segment"));
        }
        if opens == 1 && !(segment.starts_with('{') && segment.ends_with('}') && segment.len() > 2) {
            return Err(invalid("a parameter must span the whole segment"));
        }
    }
    Ok(())
}

/// Path with parameter names erased.
fn path_shape(path: &str) -> String {
    path.split('/')
        .map(|segment| if segment.starts_with('{') { "{}" } else { segment })
        .collect::<Vec<_>>()
        .join("/")
}

enum StubError {
    Schema(SchemaError),
    Status(u16),
}

/// Compiled request checks and reply for one manifest route.
struct StubRoute {
    checks: Vec<(Section, Box<dyn PayloadValidator>)>,
    status: StatusCode,
    body: Option<Value>,
}

impl StubRoute {
    fn compile(spec: &RouteSpec, guard: &ContractGuard) -> Result<Self, StubError> {
        let status = StatusCode::from_u16(spec.reply.status)
            .ok()
            .filter(|status| (100..=599).contains(&status.as_u16()))
            .ok_or(StubError::Status(spec.reply.status))?;

        // Fixed checking order: params, body, query, headers.
        let sections = [
            (Section::Params, &spec.request.params),
            (Section::Body, &spec.request.body),
            (Section::Query, &spec.request.query),
            (Section::Headers, &spec.request.headers),
        ];
        let mut checks = Vec::new();
        for (section, schema) in sections {
            if let Some(schema) = schema {
                let validator = guard.compiler().compile(schema).map_err(StubError::Schema)?;
                checks.push((section, validator));
            }
        }

        Ok(Self {
            checks,
            status,
            body: spec.reply.body.clone(),
        })
    }

    async fn handle(&self, request: Request) -> Response {
        match self.check_request(request).await {
            Ok(()) => self.reply(),
            Err(err) => err.into_response(),
        }
    }

    async fn check_request(&self, request: Request) -> Result<(), AppError> {
        let (mut parts, body) = request.into_parts();

        let params = match parts.extract::<RawPathParams>().await {
            Ok(raw) => params_value(raw.iter()),
            Err(_) => Value::Object(Map::new()),
        };
        let query = query_value(&parts.uri);
        let headers = headers_value(&parts.headers);

        let wants_body = self.checks.iter().any(|(section, _)| *section == Section::Body);
        let body = if wants_body {
            let JsonBody(value) = JsonBody::from_request(Request::from_parts(parts, body), &()).await?;
            value
        } else {
            Value::Null
        };

        for (section, validator) in &self.checks {
            let value = match section {
                Section::Params => &params,
                Section::Body => &body,
                Section::Query => &query,
                Section::Headers => &headers,
                Section::Response => continue,
            };
            check_section(*section, validator.as_ref(), value)?;
        }
        Ok(())
    }

    fn reply(&self) -> Response {
        match &self.body {
            Some(body) => (self.status, Json(body.clone())).into_response(),
            None => self.status.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conform_schema::{ContractOptions, JsonSchemaCompiler};
    use serde_json::json;

    fn guard() -> ContractGuard {
        ContractGuard::new(
            Arc::new(JsonSchemaCompiler::new()),
            ContractOptions::default(),
            1024 * 1024,
        )
    }

    fn manifest(routes: Value) -> Manifest {
        Manifest::from_value(json!({ "routes": routes })).unwrap()
    }

    #[test]
    fn parses_defaults() {
        let m = manifest(json!([{ "method": "get", "path": "/ping" }]));
        let route = &m.routes[0];
        assert_eq!(route.reply.status, 200);
        assert!(route.reply.body.is_none());
        assert!(route.responses.is_empty());
        assert!(route.request.body.is_none());
    }

    #[test]
    fn querystring_alias_is_accepted() {
        let m = manifest(json!([{
            "method": "GET",
            "path": "/search",
            "request": { "querystring": { "type": "object" } }
        }]));
        assert!(m.routes[0].request.query.is_some());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = Manifest::from_value(json!({ "routes": [{ "method": "GET", "path": "/", "replies": {} }] }))
            .unwrap_err();
        assert!(matches!(err, ManifestError::Parse(_)));
    }

    #[test]
    fn builds_router_for_valid_manifest() {
        let m = manifest(json!([
            { "method": "GET", "path": "/users/{id}", "responses": { "200": { "type": "object" } } },
            { "method": "DELETE", "path": "/users/{id}", "reply": { "status": 204 } },
            { "method": "POST", "path": "/users", "request": { "body": { "type": "object" } } }
        ]));
        assert!(m.router(&guard()).is_ok());
    }

    #[test]
    fn rejects_bad_methods_and_paths() {
        let err = manifest(json!([{ "method": "GE T", "path": "/x" }]))
            .router(&guard())
            .unwrap_err();
        assert!(matches!(err, ManifestError::InvalidMethod { index: 0, .. }));

        for path in ["users", "/metrics", "/users/:id", "/files/*rest", "/a/{b}{c}", "/a/x{b}"] {
            let err = manifest(json!([{ "method": "GET", "path": path }]))
                .router(&guard())
                .unwrap_err();
            assert!(matches!(err, ManifestError::InvalidPath { .. }), "{path}: {err}");
        }
    }

    #[test]
    fn rejects_conflicting_parameter_names() {
        let err = manifest(json!([
            { "method": "GET", "path": "/users/{id}" },
            { "method": "PUT", "path": "/users/{name}" }
        ]))
        .router(&guard())
        .unwrap_err();
        assert!(matches!(err, ManifestError::InvalidPath { index: 1, .. }));
    }

    #[test]
    fn rejects_duplicate_routes() {
        let err = manifest(json!([
            { "method": "GET", "path": "/x" },
            { "method": "get", "path": "/x" }
        ]))
        .router(&guard())
        .unwrap_err();
        assert!(matches!(err, ManifestError::DuplicateRoute { index: 1, .. }));
    }

    #[test]
    fn rejects_bad_reply_status() {
        let err = manifest(json!([{ "method": "GET", "path": "/x", "reply": { "status": 999 } }]))
            .router(&guard())
            .unwrap_err();
        assert!(matches!(err, ManifestError::InvalidReplyStatus { status: 999, .. }));
    }

    #[test]
    fn schema_errors_name_the_route() {
        let err = manifest(json!([{
            "method": "GET",
            "path": "/x",
            "responses": { "ok": { "type": "object" } }
        }]))
        .router(&guard())
        .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("GET /x"), "{text}");
        assert!(matches!(
            err,
            ManifestError::Compile {
                source: SchemaError::InvalidStatusKey(_),
                ..
            }
        ));
    }
}
