//! # Prometheus Metrics
//!
//! Counters are recorded through the `metrics` facade and exported by the
//! Prometheus recorder at `/metrics`. When no recorder is installed every
//! counter is a no-op, so the recording helpers are always safe to call.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use conform_core::Section;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

pub const HTTP_REQUESTS_TOTAL: &str = "conform_http_requests_total";
pub const CONTRACT_VIOLATIONS_TOTAL: &str = "conform_contract_violations_total";
pub const REQUEST_VALIDATION_FAILURES_TOTAL: &str = "conform_request_validation_failures_total";

/// Install the process-wide Prometheus recorder.
///
/// Fails if another recorder is already installed.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Count one response rejected by its route's contract.
pub fn record_contract_violation(kind: &'static str) {
    metrics::counter!(CONTRACT_VIOLATIONS_TOTAL, "kind" => kind).increment(1);
}

/// Count one request rejected by a section schema.
pub fn record_request_validation_failure(section: Section) {
    metrics::counter!(REQUEST_VALIDATION_FAILURES_TOTAL, "section" => section.as_str()).increment(1);
}

/// Middleware that counts requests by method and status class.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().as_str().to_owned();

    let response = next.run(request).await;

    let class = match response.status().as_u16() / 100 {
        1 => "1xx",
        2 => "2xx",
        3 => "3xx",
        4 => "4xx",
        _ => "5xx",
    };
    metrics::counter!(HTTP_REQUESTS_TOTAL, "method" => method, "status" => class).increment(1);

    response
}
