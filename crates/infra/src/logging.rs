//! Tracing subscriber setup for the background host
//!
//! Filter directives come from `RUST_LOG`, falling back to
//! [`DEFAULT_FILTER`]. Output always goes to stderr: stdout carries the RPC
//! transport.

use tracing_subscriber::{fmt, EnvFilter};
use vidsum_domain::{LogFormat, LoggingConfig, Result, VidSumError};

/// Directives used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "warn,vidsum=info";

/// Install the global subscriber.
///
/// # Errors
/// Returns `VidSumError::Internal` if a global subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);

    let installed = match config.format {
        LogFormat::Pretty => builder.with_target(false).try_init(),
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
    };

    installed.map_err(|e| VidSumError::Internal(format!("failed to install tracing subscriber: {e}")))
}
