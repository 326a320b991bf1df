//! # conform-api: Axum Host Layer
//!
//! Serves JSON-schema-validated routes with structured error responses and
//! per-route response contracts.
//!
//! ## Routes
//!
//! - `/health/liveness`, `/health/readiness`: probes
//! - `/metrics`: Prometheus exposition (when enabled)
//! - routes supplied by the caller, typically built from a route manifest
//!   ([`manifest::Manifest::router`])
//! - anything else: JSON 404
//!
//! ## Middleware Stack (Tower)
//!
//! TraceLayer → MetricsMiddleware → [per route] ContractMiddleware → Handler
//!
//! ## Crate Policy
//!
//! - All errors leave through [`AppError`], one JSON shape for every failure.
//! - Validation and contract logic lives in `conform-schema`; this crate only
//!   adapts it to HTTP.

pub mod config;
pub mod error;
pub mod extractors;
pub mod manifest;
pub mod middleware;
pub mod state;

use axum::middleware::from_fn;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

pub use config::AppConfig;
pub use error::AppError;
pub use middleware::contract::ContractGuard;
pub use state::AppState;

/// Message of the JSON 404 response.
pub const NOT_FOUND_MESSAGE: &str = "Not found.";

/// Assemble the application router around `routes`.
pub fn app(state: AppState, routes: Router) -> Router {
    let mut router = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .merge(routes)
        .fallback(not_found);

    if let Some(handle) = state.metrics.clone() {
        router = router.route(
            "/metrics",
            get(move || {
                let handle = handle.clone();
                async move { handle.render() }
            }),
        );
    }

    if state.config.metrics_enabled {
        router = router.layer(from_fn(middleware::metrics::metrics_middleware));
    }

    router.layer(TraceLayer::new_for_http())
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: routes are compiled before serving, so a running
/// server is ready.
async fn readiness() -> &'static str {
    "ready"
}

async fn not_found() -> AppError {
    AppError::NotFound(NOT_FOUND_MESSAGE.to_string())
}
