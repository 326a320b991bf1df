//! # Response Contract Middleware
//!
//! Checks every response a guarded route produces against the route's
//! per-status schemas before it is sent. The body is buffered, parsed as
//! JSON and enforced; a conforming response is rebuilt unchanged, anything
//! else is replaced with the matching [`AppError`].
//!
//! Responses built from [`AppError`] carry the [`ErrorResponse`] marker and
//! pass through unchecked, so a rejected request keeps its 400.
//!
//! Guards are attached per route with `route_layer`, so routes without
//! response schemas and the 404 fallback are never touched.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::middleware::{from_fn_with_state, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::MethodRouter;
use conform_core::Section;
use conform_schema::{
    message, ContractOptions, ContractViolation, MessageArg, NormalizedErrors, ResponseContract,
    SchemaCompiler, SchemaError, ROOT_KEY,
};
use serde_json::Value;

use crate::error::{AppError, ErrorResponse};
use crate::middleware::metrics::record_contract_violation;

/// Compiles response tables and attaches the enforcing middleware.
#[derive(Clone)]
pub struct ContractGuard {
    compiler: Arc<dyn SchemaCompiler>,
    options: ContractOptions,
    body_limit: usize,
}

impl fmt::Debug for ContractGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractGuard")
            .field("options", &self.options)
            .field("body_limit", &self.body_limit)
            .finish_non_exhaustive()
    }
}

impl ContractGuard {
    pub fn new(compiler: Arc<dyn SchemaCompiler>, options: ContractOptions, body_limit: usize) -> Self {
        Self {
            compiler,
            options,
            body_limit,
        }
    }

    pub fn compiler(&self) -> &dyn SchemaCompiler {
        self.compiler.as_ref()
    }

    /// Attach the contract for `schemas` to `route`.
    ///
    /// An empty table returns the route untouched.
    pub fn guard<S>(
        &self,
        route: MethodRouter<S>,
        schemas: &BTreeMap<String, Value>,
    ) -> Result<MethodRouter<S>, SchemaError>
    where
        S: Clone + Send + Sync + 'static,
    {
        let Some(contract) = ResponseContract::compile(schemas, self.compiler.as_ref(), self.options)? else {
            return Ok(route);
        };

        let guarded = Arc::new(GuardedContract {
            contract,
            body_limit: self.body_limit,
        });
        Ok(route.route_layer(from_fn_with_state(guarded, enforce_contract)))
    }
}

struct GuardedContract {
    contract: ResponseContract,
    body_limit: usize,
}

async fn enforce_contract(
    State(guarded): State<Arc<GuardedContract>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let response = next.run(request).await;
    let status = response.status().as_u16();

    // The generic internal-error response is never checked, and neither are
    // error bodies the service produced itself (request validation, 404).
    if status == 500 || response.extensions().get::<ErrorResponse>().is_some() {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, guarded.body_limit).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return AppError::Internal(format!(
                "{method} {path}: response body could not be buffered: {e}"
            ))
            .into_response();
        }
    };

    match check(&guarded.contract, status, &bytes) {
        Ok(()) => Response::from_parts(parts, Body::from(bytes)),
        Err(violation) => {
            tracing::warn!(
                %method,
                path = %path,
                status,
                kind = violation.kind(),
                "response violates route contract"
            );
            record_contract_violation(violation.kind());
            AppError::from(violation).into_response()
        }
    }
}

fn check(contract: &ResponseContract, status: u16, bytes: &Bytes) -> Result<(), ContractViolation> {
    if bytes.is_empty() {
        return contract.enforce(status, &Value::Null);
    }

    match serde_json::from_slice::<Value>(bytes) {
        Ok(payload) => contract.enforce(status, &payload),
        Err(_) if contract.declares(status) => Err(ContractViolation::InvalidPayload {
            status,
            failed_validations: unparsable_payload(),
        }),
        // Undeclared statuses fail (or pass) on the status alone.
        Err(_) => contract.enforce(status, &Value::Null),
    }
}

fn unparsable_payload() -> NormalizedErrors {
    let mut errors = NormalizedErrors::new(Section::Response);
    errors.insert(ROOT_KEY, message("json", MessageArg::None));
    errors
}
