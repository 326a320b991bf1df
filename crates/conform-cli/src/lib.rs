//! # conform-cli: CLI Tool for conform
//!
//! Provides the `conform` command-line interface over the normalizer and the
//! response contract enforcer.
//!
//! ## Subcommands
//!
//! - `conform normalize`: normalize raw validator failures.
//! - `conform validate`: validate a document and print normalized failures.
//! - `conform check`: enforce a response table against one payload.
//!
//! ```bash
//! conform validate --schema user.schema.yaml --section body --data user.json
//! conform check --responses responses.yaml --status 200 --payload reply.json
//! ```
//!
//! Every subcommand exits 0 on success, 1 when the input is rejected and 2
//! when it cannot run at all (unreadable file, broken schema).

pub mod check;
pub mod normalize;
pub mod validate;

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use conform_schema::{load_document, NormalizedErrors};
use serde_json::Value;

/// Load a JSON or YAML document, naming the file on failure.
pub fn read_document(path: &Path) -> Result<Value> {
    load_document(path).with_context(|| format!("cannot load {}", path.display()))
}

/// Print normalized failures as pretty JSON, or as `describe()` lines.
pub fn write_errors(out: &mut dyn Write, errors: &NormalizedErrors, text: bool) -> Result<()> {
    if text {
        for line in errors.describe() {
            writeln!(out, "{line}")?;
        }
    } else {
        writeln!(out, "{}", serde_json::to_string_pretty(errors)?)?;
    }
    Ok(())
}
