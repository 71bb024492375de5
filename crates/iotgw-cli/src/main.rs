//! # iotgw-validate entry point
//!
//! Parses arguments, initialises logging and maps the handler's result to
//! a process exit code.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use iotgw_cli::resolve_repo_root;
use iotgw_cli::validate::{run_validate, ValidateArgs, EXIT_FATAL};

/// Validate IoT gateway configuration files.
///
/// Merges `includes`, checks the result against the gateway grammar and
/// verifies every bridge endpoint names a connector. With `--fragment`,
/// checks a single protocol fragment instead.
#[derive(Parser, Debug)]
#[command(name = "iotgw-validate", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(flatten)]
    args: ValidateArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

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

    let repo_root = resolve_repo_root().unwrap_or_else(|| {
        tracing::warn!("could not locate repository root; using current directory");
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    });
    tracing::debug!(repo_root = %repo_root.display(), "resolved repository root");

    match run_validate(&cli.args, &repo_root) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("ERR: {e:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}
