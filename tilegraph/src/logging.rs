//! Logging setup for binaries and tools built on this crate.
//!
//! The library itself only emits `tracing` events. Call [`init_logging`] once
//! at startup to print them; `RUST_LOG` overrides the default filter.

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_DIRECTIVE: &str = "tilegraph=info";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{directive}': {message}")]
    InvalidDirective { directive: String, message: String },

    #[error("A global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Install a compact stdout subscriber filtered by `RUST_LOG`, or by
/// `default_directive` when the variable is unset or unparsable.
///
/// # Errors
///
/// [`LoggingError::InvalidDirective`] when the fallback directive does not
/// parse, [`LoggingError::AlreadyInitialized`] when a subscriber exists.
pub fn init_logging(default_directive: &str) -> Result<(), LoggingError> {
    let filter = build_filter(std::env::var("RUST_LOG").ok(), default_directive)?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact().with_target(true))
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)
}

fn build_filter(env: Option<String>, default_directive: &str) -> Result<EnvFilter, LoggingError> {
    if let Some(filter) = env.and_then(|value| EnvFilter::try_new(value).ok()) {
        return Ok(filter);
    }
    EnvFilter::try_new(default_directive).map_err(|e| LoggingError::InvalidDirective {
        directive: default_directive.to_string(),
        message: e.to_string(),
    })
}
