//! Logging initialisation.
//!
//! ## NIST 800-53 Rev5: AU-2 (Event Logging)
//!
//! All crates log through `tracing`; this module installs the subscriber.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{Error, Result};

/// Builds the filter for a logging configuration.
///
/// # Errors
///
/// Returns `Error::Logging` if the directive cannot be parsed.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    EnvFilter::try_new(&config.filter)
        .map_err(|e| Error::Logging(format!("invalid filter '{}': {e}", config.filter)))
}

/// Installs the global `tracing` subscriber.
///
/// Calling this more than once is an error; tests should use [`try_init`].
///
/// # Errors
///
/// Returns `Error::Logging` if the filter is invalid or a subscriber is
/// already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Text => registry.with(fmt::layer()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    }
    .map_err(|e| Error::Logging(e.to_string()))
}

/// Installs the global subscriber, ignoring an already-installed one.
pub fn try_init(config: &LoggingConfig) {
    let _ = init(config);
}
