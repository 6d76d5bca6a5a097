//! Error types used throughout the background process

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message shown when the session cannot be recovered by a refresh.
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please log in again.";

/// Message shown when a job never reaches a terminal status.
pub const ANALYSIS_TIMEOUT_MESSAGE: &str =
    "Analysis timed out. The video may be too long to process.";

/// Message returned for actions outside the enumerated set.
pub const UNKNOWN_ACTION_MESSAGE: &str = "Unknown action";

/// Main error type for VidSum
///
/// A failed job is *not* represented here: `JobStatus::Failed` is a normal
/// poll outcome and handlers decide how to surface it.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum VidSumError {
    /// Refresh failed or no refresh credential existed; the session was
    /// cleared and the user must log in again.
    #[error("{}", SESSION_EXPIRED_MESSAGE)]
    SessionExpired,

    /// Non-2xx response other than the unauthorized-then-refresh-failed case.
    #[error("{}", api_error_message(.status, .detail))]
    Api { status: u16, detail: Option<String> },

    /// Job did not reach a terminal status before the deadline.
    #[error("{}", ANALYSIS_TIMEOUT_MESSAGE)]
    AnalysisTimeout,

    /// A poll or request was stopped through its cancellation token.
    #[error("Analysis cancelled")]
    Cancelled,

    /// Dispatcher received an action outside the enumerated set.
    #[error("{}", UNKNOWN_ACTION_MESSAGE)]
    UnknownAction(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn api_error_message(status: &u16, detail: &Option<String>) -> String {
    match detail {
        Some(detail) => detail.clone(),
        None => format!("API Error: {status}"),
    }
}

impl VidSumError {
    /// Build an API error without a server-provided detail.
    #[must_use]
    pub const fn api(status: u16) -> Self {
        Self::Api { status, detail: None }
    }

    /// Build an API error carrying the server's `detail` message.
    #[must_use]
    pub fn api_with_detail(status: u16, detail: impl Into<String>) -> Self {
        Self::Api { status, detail: Some(detail.into()) }
    }

    /// Stable label suitable for structured logging.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::SessionExpired => "AUTH_EXPIRED",
            Self::Api { .. } => "API_ERROR",
            Self::AnalysisTimeout => "ANALYSIS_TIMEOUT",
            Self::Cancelled => "CANCELLED",
            Self::UnknownAction(_) => "UNKNOWN_ACTION",
            Self::Network(_) => "NETWORK_ERROR",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether a poll loop may keep going after observing this error.
    ///
    /// Transport failures and server-side (5xx) errors are transient; auth
    /// expiry, client errors and cancellation are not.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for VidSumError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for VidSum operations
pub type Result<T> = std::result::Result<T, VidSumError>;
