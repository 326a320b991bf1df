//! # Normalize Subcommand
//!
//! Normalizes a list of raw validator failure records without running any
//! schema. Useful for checking how failures from another validator will be
//! reported.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use conform_core::{FailureRecord, Section};
use conform_schema::normalize;
use serde_json::Value;

use crate::{read_document, write_errors};

/// Arguments for the `conform normalize` subcommand.
#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// Section the failures belong to (query, querystring, params, body, headers, response).
    #[arg(long)]
    pub section: Section,

    /// JSON or YAML file holding an array of failure records.
    #[arg(long, value_name = "PATH")]
    pub failures: PathBuf,

    /// The validated document, consulted for empty-value checks.
    #[arg(long, value_name = "PATH")]
    pub data: Option<PathBuf>,

    /// Print `section.path: Message` lines instead of JSON.
    #[arg(long)]
    pub text: bool,
}

/// Execute the normalize subcommand. Always exits 0 once the inputs load.
pub fn run_normalize(args: &NormalizeArgs, out: &mut dyn Write) -> Result<u8> {
    let failures = parse_failures(read_document(&args.failures)?)?;
    let data = match &args.data {
        Some(path) => read_document(path)?,
        None => Value::Null,
    };

    tracing::debug!(count = failures.len(), section = %args.section, "normalizing failures");
    let errors = normalize(args.section, &data, &failures);
    write_errors(out, &errors, args.text)?;
    Ok(0)
}

fn parse_failures(document: Value) -> Result<Vec<FailureRecord>> {
    let Value::Array(items) = document else {
        bail!("failure file must hold a JSON array of failure records");
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| FailureRecord::from_value(item).with_context(|| format!("failure record {i}")))
        .collect()
}
