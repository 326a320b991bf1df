//! # Validate Subcommand
//!
//! Compiles a JSON Schema with the bundled compiler, validates one document
//! against it, and prints the failures in normalized form.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use conform_core::Section;
use conform_schema::{normalize, JsonSchemaCompiler, PayloadValidator};

use crate::{read_document, write_errors};

/// Arguments for the `conform validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// JSON Schema file (JSON or YAML).
    #[arg(long, value_name = "PATH")]
    pub schema: PathBuf,

    /// Section the document represents; used as the output key.
    #[arg(long, default_value = "body")]
    pub section: Section,

    /// Document to validate (JSON or YAML).
    #[arg(long, value_name = "PATH")]
    pub data: PathBuf,

    /// Print `section.path: Message` lines instead of JSON.
    #[arg(long)]
    pub text: bool,
}

/// Execute the validate subcommand.
///
/// Returns exit code: 0 when the document is valid, 1 when it is not.
pub fn run_validate(args: &ValidateArgs, out: &mut dyn Write) -> Result<u8> {
    let schema = read_document(&args.schema)?;
    let data = read_document(&args.data)?;

    let validator = JsonSchemaCompiler::new()
        .build(&schema)
        .with_context(|| format!("cannot compile {}", args.schema.display()))?;

    let outcome = validator.validate(&data);
    if outcome.valid {
        tracing::info!(data = %args.data.display(), "document is valid");
        writeln!(out, "ok")?;
        return Ok(0);
    }

    let errors = normalize(args.section, &data, &outcome.errors);
    tracing::info!(failures = errors.len(), "document is invalid");
    write_errors(out, &errors, args.text)?;
    Ok(1)
}
