//! # Integration Tests for conform-api
//!
//! Health probes, the JSON 404 fallback, response contract enforcement on
//! hand-written handlers, and request validation through manifest-built
//! stub routes.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use conform_api::manifest::Manifest;
use conform_api::{AppConfig, AppError, AppState, ContractGuard};
use conform_core::Section;
use conform_schema::{ContractOptions, JsonSchemaCompiler, NormalizedErrors};

fn guard(allow_undeclared_responses: bool) -> ContractGuard {
    ContractGuard::new(
        Arc::new(JsonSchemaCompiler::new()),
        ContractOptions {
            allow_undeclared_responses,
        },
        1024 * 1024,
    )
}

fn test_app(routes: Router) -> Router {
    conform_api::app(AppState::new(AppConfig::default()), routes)
}

/// Only `200` is declared: an object with integer `id` and string `name`.
fn user_responses() -> BTreeMap<String, Value> {
    let mut schemas = BTreeMap::new();
    schemas.insert(
        "200".to_string(),
        json!({
            "type": "object",
            "required": ["id", "name"],
            "properties": {
                "id": { "type": "integer" },
                "name": { "type": "string" }
            }
        }),
    );
    schemas.insert("500".to_string(), json!({ "type": "object", "required": ["never"] }));
    schemas
}

fn contract_routes(allow_undeclared_responses: bool) -> Router {
    let guard = guard(allow_undeclared_responses);
    let schemas = user_responses();
    let route = |handler: axum::routing::MethodRouter| guard.guard(handler, &schemas).unwrap();

    Router::new()
        .route(
            "/good",
            route(get(|| async { Json(json!({ "id": 1, "name": "Ada" })) })),
        )
        .route(
            "/bad",
            route(get(|| async { Json(json!({ "id": "one" })) })),
        )
        .route(
            "/created",
            route(get(|| async { (StatusCode::CREATED, Json(json!({ "id": 2 }))) })),
        )
        .route(
            "/boom",
            route(get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "stack trace here") })),
        )
        .route(
            "/html",
            route(get(|| async { "<html></html>" })),
        )
        .route(
            "/reject",
            route(get(|| async {
                let mut errors = NormalizedErrors::new(Section::Query);
                errors.insert("page", "must be present");
                Err::<Json<Value>, AppError>(AppError::Validation(errors))
            })),
        )
        .route("/unguarded", get(|| async { (StatusCode::ACCEPTED, "anything") }))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

async fn get_path(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

fn as_json(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

fn body_code(bytes: &[u8]) -> String {
    as_json(bytes)["error"]["code"].as_str().unwrap_or_default().to_string()
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let (status, body) = get_path(test_app(Router::new()), "/health/liveness").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn test_readiness_probe() {
    let (status, body) = get_path(test_app(Router::new()), "/health/readiness").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ready");
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let (status, body) = get_path(test_app(Router::new()), "/nowhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        as_json(&body),
        json!({ "error": { "code": "NOT_FOUND", "message": "Not found." } })
    );
}

#[tokio::test]
async fn test_metrics_not_mounted_without_recorder() {
    let (status, _) = get_path(test_app(Router::new()), "/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// -- Response Contracts -------------------------------------------------------

#[tokio::test]
async fn test_undeclared_status_is_rejected() {
    let (status, body) = get_path(test_app(contract_routes(false)), "/created").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = as_json(&body);
    assert_eq!(body["error"]["code"], "INVALID_RESPONSE_CODE");
    assert_eq!(
        body["error"]["message"],
        "This endpoint cannot respond with HTTP status 201."
    );
    assert!(body["error"].get("failedValidations").is_none());
}

#[tokio::test]
async fn test_conforming_response_passes_unchanged() {
    let (status, body) = get_path(test_app(contract_routes(false)), "/good").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_json(&body), json!({ "id": 1, "name": "Ada" }));
}

#[tokio::test]
async fn test_invalid_payload_reports_each_field() {
    let (status, body) = get_path(test_app(contract_routes(false)), "/bad").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        as_json(&body),
        json!({
            "error": {
                "code": "INVALID_RESPONSE",
                "message": "The response returned from the endpoint violates its specification for the HTTP status 200.",
                "failedValidations": {
                    "response": {
                        "id": "must be a valid integer number",
                        "name": "must be present"
                    }
                }
            }
        })
    );
}

#[tokio::test]
async fn test_status_500_is_never_checked() {
    let (status, body) = get_path(test_app(contract_routes(false)), "/boom").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, b"stack trace here");
}

#[tokio::test]
async fn test_non_json_body_on_declared_status() {
    let (status, body) = get_path(test_app(contract_routes(false)), "/html").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = as_json(&body);
    assert_eq!(body["error"]["code"], "INVALID_RESPONSE");
    assert_eq!(
        body["error"]["failedValidations"]["response"]["$root"],
        "the body payload is not a valid JSON"
    );
}

#[tokio::test]
async fn test_unguarded_routes_are_untouched() {
    let (status, body) = get_path(test_app(contract_routes(false)), "/unguarded").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, b"anything");
}

#[tokio::test]
async fn test_handler_validation_error_keeps_its_400() {
    // `/reject` declares only 200; its own 400 error body is not checked.
    let (status, body) = get_path(test_app(contract_routes(false)), "/reject").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body_code(&body), "VALIDATION_ERROR");
    assert_eq!(
        as_json(&body)["error"]["failedValidations"],
        json!({ "query": { "page": "must be present" } })
    );
}

#[tokio::test]
async fn test_allow_undeclared_responses() {
    let (status, body) = get_path(test_app(contract_routes(true)), "/created").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(as_json(&body), json!({ "id": 2 }));

    // Declared statuses are still checked.
    let (status, _) = get_path(test_app(contract_routes(true)), "/bad").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

// -- Manifest Stub Routes -----------------------------------------------------

fn manifest_app() -> Router {
    let manifest = Manifest::from_value(json!({
        "routes": [
            {
                "method": "POST",
                "path": "/users",
                "request": {
                    "body": {
                        "type": "object",
                        "required": ["name"],
                        "additionalProperties": false,
                        "properties": {
                            "name": { "type": "string", "pattern": ".+" },
                            "email": { "type": "string", "format": "email" }
                        }
                    }
                },
                "responses": { "201": { "type": "object", "required": ["id"] } },
                "reply": { "status": 201, "body": { "id": 7 } }
            },
            {
                "method": "GET",
                "path": "/users/{id}",
                "request": {
                    "params": {
                        "type": "object",
                        "properties": { "id": { "type": "string", "pattern": "^[0-9]+$" } }
                    }
                },
                "responses": { "200": { "type": "object", "required": ["id", "name"] } },
                "reply": { "status": 200, "body": { "id": 7 } }
            },
            {
                "method": "GET",
                "path": "/search",
                "request": {
                    "querystring": { "type": "object", "required": ["q"] }
                },
                "reply": { "status": 200, "body": [] }
            }
        ]
    }))
    .unwrap();
    test_app(manifest.router(&guard(false)).unwrap())
}

fn post_json(uri: &str, content_type: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(ct) = content_type {
        builder = builder.header("content-type", ct);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_valid_request_gets_canned_reply() {
    let (status, body) = send(
        manifest_app(),
        post_json("/users", Some("application/json"), r#"{"name":"Ada"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(as_json(&body), json!({ "id": 7 }));
}

#[tokio::test]
async fn test_body_validation_failure_is_400() {
    let (status, body) = send(
        manifest_app(),
        post_json("/users", Some("application/json"), r#"{"name":"","role":"admin"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        as_json(&body),
        json!({
            "error": {
                "code": "VALIDATION_ERROR",
                "message": "One or more validations failed trying to process your request.",
                "failedValidations": {
                    "body": {
                        "name": "must be a non empty string",
                        "role": "is not a valid property"
                    }
                }
            }
        })
    );
}

#[tokio::test]
async fn test_missing_content_type_is_400() {
    let (status, body) = send(manifest_app(), post_json("/users", None, r#"{"name":"Ada"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = as_json(&body)["error"]["failedValidations"]["body"]["$root"].clone();
    assert!(message
        .as_str()
        .unwrap()
        .starts_with("only JSON payloads are accepted"));
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let (status, body) =
        send(manifest_app(), post_json("/users", Some("application/json"), "{")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        as_json(&body)["error"]["failedValidations"]["body"]["$root"],
        "the body payload is not a valid JSON"
    );
}

#[tokio::test]
async fn test_params_validation_failure_is_400() {
    let (status, body) = get_path(manifest_app(), "/users/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        as_json(&body)["error"]["failedValidations"],
        json!({ "params": { "id": "must match pattern \"^[0-9]+$\"" } })
    );
}

#[tokio::test]
async fn test_invalid_request_on_contract_route_is_client_error() {
    // `GET /users/{id}` declares only a 200 response.
    let (status, body) = get_path(manifest_app(), "/users/x1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body_code(&body), "VALIDATION_ERROR");

    let (status, body) = send(manifest_app(), post_json("/users", Some("text/plain"), "hi")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body_code(&body), "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_query_failures_are_keyed_query() {
    let (status, body) = get_path(manifest_app(), "/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        as_json(&body)["error"]["failedValidations"],
        json!({ "query": { "q": "must be present" } })
    );

    let (status, _) = get_path(manifest_app(), "/search?q=rust").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_reply_breaking_its_contract_is_500() {
    let (status, body) = get_path(manifest_app(), "/users/7").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = as_json(&body);
    assert_eq!(body["error"]["code"], "INVALID_RESPONSE");
    assert_eq!(
        body["error"]["failedValidations"]["response"]["name"],
        "must be present"
    );
}

#[tokio::test]
async fn test_yaml_manifest_loads_and_serves() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    write!(
        file,
        "routes:\n  - method: GET\n    path: /ping\n    responses:\n      200:\n        type: object\n        required: [pong]\n    reply:\n      status: 200\n      body: {{ pong: true }}\n"
    )
    .unwrap();

    let manifest = Manifest::load(file.path()).unwrap();
    let app = test_app(manifest.router(&guard(false)).unwrap());
    let (status, body) = get_path(app, "/ping").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_json(&body), json!({ "pong": true }));
}
