//! # Error Types
//!
//! Errors raised by the foundational types. Everything here is a caller
//! mistake (bad section name, malformed record) rather than a validation
//! outcome; validation outcomes are data, not errors.

use thiserror::Error;

/// Top-level error type for conform-core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConformError {
    /// The section name is not one of query, params, body, headers, response.
    #[error("unknown section '{0}' (expected query, querystring, params, body, headers or response)")]
    UnknownSection(String),

    /// A failure record could not be decoded.
    #[error("invalid failure record: {0}")]
    InvalidFailureRecord(String),
}
