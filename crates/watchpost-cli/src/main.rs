//! watchpost - command-line front-end for the server-monitoring dashboard.
//!
//! Talks to the backend through the local proxy origin, keeps the login
//! session in durable storage between runs, and guards every view behind
//! the same navigation rules as the web dashboard.

mod app;
mod cli;
mod view;

use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use watchpost_core::Config;

use app::App;
use cli::Cli;

const LOG_FILE_PREFIX: &str = "watchpost.log";

/// Initialize the tracing subscriber for logging.
///
/// Records go to stderr and, when the data directory is usable, to a daily
/// rolling file. The returned guard must live until exit so the file writer
/// flushes.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) if std::fs::create_dir_all(dir).is_ok() => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        _ => (None, None),
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

    let cli = Cli::parse();

    // Logging first, so config override warnings are recorded
    let log_dir = Config::default().data_dir().ok();
    let _log_guard = init_tracing(log_dir.as_deref());

    let config = Config::load().context("Failed to load configuration")?;
    info!(
        proxy = %config.proxy_origin,
        prefix = %config.api_prefix,
        backend = %config.api_base_url,
        "watchpost starting"
    );

    let mut app = App::new(config)?;
    app.run(cli.command).await
}
