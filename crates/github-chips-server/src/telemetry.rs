//! Tracing subscriber setup.
//!
//! # Configuration
//!
//! - `RUST_LOG`: Log filter (default: `info,github_chips=debug,github_chips_server=debug`)
//! - `log_format`: `pretty` for local development, `json` for log collectors

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

const DEFAULT_FILTER: &str = "info,github_chips=debug,github_chips_server=debug";

/// Install the global tracing subscriber.
pub fn init(format: LogFormat) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            )
            .try_init()?,
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(true)
                    .with_line_number(true)
                    .pretty(),
            )
            .try_init()?,
    }

    tracing::info!(format = ?format, "Telemetry initialized");

    Ok(())
}
