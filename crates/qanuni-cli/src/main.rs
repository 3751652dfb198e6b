//! qanuni - command line client for the legal-services portal API.
//!
//! Signs in, registers accounts, runs the WhatsApp verification and password
//! recovery flows, and keeps the issued tokens in the OS keychain between
//! runs.

mod actions;
mod commands;

use std::io;

use anyhow::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log file name prefix inside the cache directory
const LOG_FILE_PREFIX: &str = "qanuni.log";

/// Initialize the tracing subscriber for logging.
///
/// Warnings go to stderr; everything the filter allows is also written to a
/// daily log file in the cache directory when one is available.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match dirs::cache_dir() {
        Some(cache_dir) => {
            let appender = tracing_appender::rolling::daily(
                cache_dir.join(qanuni_core::config::APP_NAME).join("logs"),
                LOG_FILE_PREFIX,
            );
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let matches = commands::new().get_matches();

    let _guard = init_tracing();
    info!(command = matches.subcommand_name().unwrap_or_default(), "qanuni starting");

    actions::run(&matches).await
}
