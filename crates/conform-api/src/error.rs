//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Request validation failures, contract violations and internal errors all
//! leave the service through [`AppError`], so every error body has the same
//! shape:
//!
//! ```json
//! { "error": { "code": "...", "message": "...", "failedValidations": { ... } } }
//! ```
//!
//! Internal error details are logged and never returned to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use conform_schema::{message, ContractViolation, MessageArg, NormalizedErrors};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message returned for every request validation failure.
pub const VALIDATION_MESSAGE: &str = "One or more validations failed trying to process your request.";

/// Message returned in place of internal error details.
pub const INTERNAL_MESSAGE: &str = "An error occurred trying to process your request.";

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "VALIDATION_ERROR", "INVALID_RESPONSE").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional context for client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Per-property messages, keyed by section.
    #[serde(
        rename = "failedValidations",
        skip_serializing_if = "Option::is_none"
    )]
    pub failed_validations: Option<serde_json::Value>,
}

/// Response extension set on every [`AppError`] response.
///
/// The response contract middleware passes marked responses through
/// unchecked: error bodies follow [`ErrorBody`], not the route's schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorResponse;

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// A request section failed its schema (400).
    #[error("{}", VALIDATION_MESSAGE)]
    Validation(NormalizedErrors),

    /// Request could not be read at all (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No route matched (404).
    #[error("{0}")]
    NotFound(String),

    /// The handler responded with a status its contract does not declare (500).
    #[error("{}", response_code_message(.status))]
    InvalidResponseCode { status: u16 },

    /// The handler's payload violates the schema declared for its status (500).
    #[error("{}", response_message(.status))]
    InvalidResponse {
        status: u16,
        failed_validations: NormalizedErrors,
    },

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

fn response_code_message(status: &u16) -> String {
    message("invalidResponseCode", MessageArg::Status(*status))
}

fn response_message(status: &u16) -> String {
    message("invalidResponse", MessageArg::Status(*status))
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::InvalidResponseCode { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INVALID_RESPONSE_CODE")
            }
            Self::InvalidResponse { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "INVALID_RESPONSE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn failed_validations(&self) -> Option<&NormalizedErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            Self::InvalidResponse {
                failed_validations, ..
            } => Some(failed_validations),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal error messages to clients.
        let message = match &self {
            Self::Internal(_) => INTERNAL_MESSAGE.to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
                failed_validations: self.failed_validations().map(NormalizedErrors::to_value),
            },
        };

        let mut response = (status, Json(body)).into_response();
        response.extensions_mut().insert(ErrorResponse);
        response
    }
}

impl From<ContractViolation> for AppError {
    fn from(violation: ContractViolation) -> Self {
        match violation {
            ContractViolation::UndeclaredStatus { status } => Self::InvalidResponseCode { status },
            ContractViolation::InvalidPayload {
                status,
                failed_validations,
            } => Self::InvalidResponse {
                status,
                failed_validations,
            },
        }
    }
}
