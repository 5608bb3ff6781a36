// Logging module - Logging infrastructure
use crate::domain::error::{Gc100Error, Gc100Result};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set
fn default_filter(level: &str, verbose: bool) -> String {
    let level = if verbose { "debug" } else { level };
    format!("gc100={},warn", level)
}

/// Initialize logging system
pub fn init_logging(level: &str, verbose: bool) -> Gc100Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(level, verbose)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(verbose)
                .with_level(true)
                .with_file(verbose)
                .with_line_number(verbose),
        )
        .try_init()
        .map_err(|e| Gc100Error::Config {
            message: format!("Failed to initialize logging: {}", e),
        })?;

    tracing::debug!("GC100 logging system initialized");
    Ok(())
}
