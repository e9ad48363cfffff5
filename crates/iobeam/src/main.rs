//! iobeam - command-line client for the iobeam IoT data platform.
//!
//! Main entry point for the `iobeam` CLI.

use std::process::ExitCode;

use anyhow::Result;
use iobeam_client::Client;
use iobeam_config::ConfigStore;
use tracing_appender::non_blocking::WorkerGuard;

mod command;
mod commands;
mod error;
mod poll;

use command::Context;

/// Environment variable holding the console log filter.
const LOG_ENV: &str = "IOBEAM_LOG";

const FILE_FILTER: &str = "iobeam=debug,iobeam_client=debug,iobeam_config=debug,warn";

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

/// Console logs on stderr plus a daily JSON log file under the config root.
///
/// Stdout is left to command output.
fn init_tracing(config: &ConfigStore) -> WorkerGuard {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    let console_filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    let log_dir = config.root().join("logs");
    let file_appender = tracing_appender::rolling::daily(log_dir, "iobeam.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(
            fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new(FILE_FILTER)),
        )
        .init();

    guard
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

fn run(config: ConfigStore) -> Result<()> {
    let args: Vec<String> = std::env::args_os()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();

    let profile = config.active_profile()?;
    tracing::debug!(profile = %profile.name, server = %profile.server, "loaded profile");

    let client = Client::builder().base_url(&profile.server).build()?;
    let (root, registry) = commands::build_tree();
    let mut ctx = Context::new(args, client, profile, config, registry);

    root.execute(&mut ctx)?;
    Ok(())
}

fn main() -> ExitCode {
    let config = match ConfigStore::discover() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let _guard = init_tracing(&config);

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
