#![warn(missing_docs)]
//! # idsec binary
//!
//! Command line entry point for `idsec`.

use std::process::ExitCode;

use clap::Parser;
use idsec_app::cli::{Cli, run};
use idsec_app::{init_tracing, redact_sensitive};

/// CLI entry point.
fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(cli.command) {
        Ok(lines) => {
            for line in lines {
                println!("{line}");
            }
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("idsec: {}", redact_sensitive(&error.to_string()));
            ExitCode::FAILURE
        }
    }
}
