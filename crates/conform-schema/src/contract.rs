//! # Response Contracts
//!
//! A route declares, per HTTP status, the schema its response payload must
//! satisfy. [`ResponseContract`] holds the compiled validators and checks
//! each outgoing `(status, payload)` pair before it reaches the client.
//!
//! Status 500 is reserved for the generic internal-error response and is
//! never checked, even when a schema is declared for it.

use std::collections::BTreeMap;
use std::fmt;

use conform_core::Section;
use serde_json::Value;
use thiserror::Error;

use crate::compile::{PayloadValidator, SchemaCompiler, SchemaError};
use crate::messages::{message, MessageArg};
use crate::normalize::{normalize, NormalizedErrors};

const INTERNAL_SERVER_ERROR: u16 = 500;

/// Registration options for a contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContractOptions {
    /// Let statuses with no declared schema through unchecked.
    pub allow_undeclared_responses: bool,
}

/// A response that breaks its route's contract.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContractViolation {
    #[error("{}", undeclared_message(.status))]
    UndeclaredStatus { status: u16 },

    #[error("{}", invalid_message(.status))]
    InvalidPayload {
        status: u16,
        failed_validations: NormalizedErrors,
    },
}

fn undeclared_message(status: &u16) -> String {
    message("invalidResponseCode", MessageArg::Status(*status))
}

fn invalid_message(status: &u16) -> String {
    message("invalidResponse", MessageArg::Status(*status))
}

impl ContractViolation {
    /// The status the handler tried to respond with.
    pub fn status(&self) -> u16 {
        match self {
            ContractViolation::UndeclaredStatus { status }
            | ContractViolation::InvalidPayload { status, .. } => *status,
        }
    }

    /// Short label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ContractViolation::UndeclaredStatus { .. } => "undeclared_status",
            ContractViolation::InvalidPayload { .. } => "invalid_payload",
        }
    }

    pub fn failed_validations(&self) -> Option<&NormalizedErrors> {
        match self {
            ContractViolation::InvalidPayload {
                failed_validations, ..
            } => Some(failed_validations),
            ContractViolation::UndeclaredStatus { .. } => None,
        }
    }
}

/// Compiled per-status response validators for one route.
pub struct ResponseContract {
    validators: BTreeMap<u16, Box<dyn PayloadValidator>>,
    options: ContractOptions,
}

impl fmt::Debug for ResponseContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseContract")
            .field("statuses", &self.declared_statuses())
            .field("options", &self.options)
            .finish()
    }
}

impl ResponseContract {
    /// Compile a status → schema table.
    ///
    /// Returns `Ok(None)` for an empty table: the route gets no guard.
    pub fn compile(
        schemas: &BTreeMap<String, Value>,
        compiler: &dyn SchemaCompiler,
        options: ContractOptions,
    ) -> Result<Option<Self>, SchemaError> {
        if schemas.is_empty() {
            return Ok(None);
        }

        let mut validators = BTreeMap::new();
        for (key, schema) in schemas {
            let status = parse_status(key)?;
            validators.insert(status, compiler.compile(schema)?);
        }

        Ok(Some(Self {
            validators,
            options,
        }))
    }

    /// Statuses with a declared schema, ascending.
    pub fn declared_statuses(&self) -> Vec<u16> {
        self.validators.keys().copied().collect()
    }

    /// Whether a schema is declared for `status`.
    pub fn declares(&self, status: u16) -> bool {
        self.validators.contains_key(&status)
    }

    pub fn options(&self) -> ContractOptions {
        self.options
    }

    /// Check one outgoing response.
    pub fn enforce(&self, status: u16, payload: &Value) -> Result<(), ContractViolation> {
        if status == INTERNAL_SERVER_ERROR {
            return Ok(());
        }

        let Some(validator) = self.validators.get(&status) else {
            if self.options.allow_undeclared_responses {
                return Ok(());
            }
            return Err(ContractViolation::UndeclaredStatus { status });
        };

        let outcome = validator.validate(payload);
        if outcome.valid {
            return Ok(());
        }

        Err(ContractViolation::InvalidPayload {
            status,
            failed_validations: normalize(Section::Response, payload, &outcome.errors),
        })
    }
}

fn parse_status(key: &str) -> Result<u16, SchemaError> {
    match key.trim().parse::<u16>() {
        Ok(status) if (100..=599).contains(&status) => Ok(status),
        _ => Err(SchemaError::InvalidStatusKey(key.to_string())),
    }
}
