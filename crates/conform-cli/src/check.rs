//! # Check Subcommand
//!
//! Compiles a response table (status → schema) and enforces it against one
//! `(status, payload)` pair, exactly as the API middleware would.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use conform_schema::{ContractOptions, ContractViolation, JsonSchemaCompiler, ResponseContract};
use serde_json::{json, Value};

use crate::read_document;

/// Arguments for the `conform check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Response table: an object mapping status codes to JSON Schemas.
    #[arg(long, value_name = "PATH")]
    pub responses: PathBuf,

    /// Status the response is sent with.
    #[arg(long)]
    pub status: u16,

    /// Response payload (JSON or YAML). Omit for an empty body.
    #[arg(long, value_name = "PATH")]
    pub payload: Option<PathBuf>,

    /// Let statuses without a declared schema through.
    #[arg(long)]
    pub allow_undeclared: bool,
}

/// Execute the check subcommand.
///
/// Returns exit code: 0 when the response conforms, 1 on a violation.
pub fn run_check(args: &CheckArgs, out: &mut dyn Write) -> Result<u8> {
    let Value::Object(table) = read_document(&args.responses)? else {
        bail!(
            "{} must hold an object mapping status codes to schemas",
            args.responses.display()
        );
    };
    let schemas: BTreeMap<String, Value> = table.into_iter().collect();

    let options = ContractOptions {
        allow_undeclared_responses: args.allow_undeclared,
    };
    let Some(contract) = ResponseContract::compile(&schemas, &JsonSchemaCompiler::new(), options)
        .with_context(|| format!("cannot compile {}", args.responses.display()))?
    else {
        bail!("{} declares no responses", args.responses.display());
    };

    let payload = match &args.payload {
        Some(path) => read_document(path)?,
        None => Value::Null,
    };

    match contract.enforce(args.status, &payload) {
        Ok(()) => {
            writeln!(out, "ok")?;
            Ok(0)
        }
        Err(violation) => {
            tracing::info!(status = args.status, kind = violation.kind(), "response violates contract");
            writeln!(out, "{}", serde_json::to_string_pretty(&violation_report(&violation))?)?;
            Ok(1)
        }
    }
}

fn violation_report(violation: &ContractViolation) -> Value {
    let mut report = json!({
        "status": violation.status(),
        "kind": violation.kind(),
        "message": violation.to_string(),
    });
    if let Some(failed) = violation.failed_validations() {
        report["failedValidations"] = failed.to_value();
    }
    report
}
