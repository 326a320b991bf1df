//! # conform CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use conform_cli::check::{run_check, CheckArgs};
use conform_cli::normalize::{run_normalize, NormalizeArgs};
use conform_cli::validate::{run_validate, ValidateArgs};

/// conform: stable, per-property messages for JSON Schema failures.
///
/// Normalizes validator output, validates documents, and checks response
/// payloads against per-status response contracts.
#[derive(Parser, Debug)]
#[command(name = "conform", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Normalize a file of raw validator failure records.
    Normalize(NormalizeArgs),

    /// Validate a document against a JSON Schema.
    Validate(ValidateArgs),

    /// Check a response payload against a response table.
    Check(CheckArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable.
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut stdout = std::io::stdout().lock();
    let result = match cli.command {
        Commands::Normalize(args) => run_normalize(&args, &mut stdout),
        Commands::Validate(args) => run_validate(&args, &mut stdout),
        Commands::Check(args) => run_check(&args, &mut stdout),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
