//! Statelock: cooperative locking and safe mutation of a shared state file.
//!
//! This is the main entry point for the `statelock` CLI. It sets up logging,
//! parses arguments, dispatches to the appropriate command handler, and
//! handles errors with proper exit codes.

mod cli;
mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod fs;
pub mod hooks;
pub mod locks;
pub mod state;

#[cfg(test)]
mod test_support;

use cli::Cli;
use std::process::ExitCode;

/// Environment variable holding the log filter, e.g. `statelock=debug`.
const LOG_ENV: &str = "STATELOCK_LOG";

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse_args();

    match commands::dispatch(cli).await {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            ExitCode::from(err.exit_code() as u8)
        }
    }
}

/// Logs go to stderr so stdout stays clean for command output.
fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}
