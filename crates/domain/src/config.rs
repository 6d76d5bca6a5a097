//! Configuration management

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_API_TIMEOUT_SECS, DEFAULT_HTTP_MAX_ATTEMPTS, HISTORY_CAPACITY,
    KEEPALIVE_INTERVAL_SECS, POLL_TIMEOUT, REFRESH_INTERVAL_SECS,
};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub polling: PollingConfig,
    pub lifecycle: LifecycleConfig,
    pub history: HistoryConfig,
    pub credentials: CredentialsConfig,
    pub logging: LoggingConfig,
}

/// HTTP API configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Total attempts for transport errors and 5xx (initial try + retries).
    pub max_attempts: usize,
}

/// Job polling configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Hard deadline for one analysis, measured from the first poll.
    pub timeout_secs: u64,
}

/// Scheduled wake-up configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    pub refresh_interval_secs: u64,
    pub keepalive_interval_secs: u64,
}

/// Recent analyses configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
}

/// Where the session is kept between restarts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    /// Process memory only; the session is lost on restart.
    #[default]
    Memory,
    /// Platform keychain (macOS Keychain, Windows Credential Manager,
    /// Linux kernel keyutils).
    Keychain,
}

/// Credential storage configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub backend: CredentialBackend,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: DEFAULT_API_TIMEOUT_SECS,
            max_attempts: DEFAULT_HTTP_MAX_ATTEMPTS,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { timeout_secs: POLL_TIMEOUT.as_secs() }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: REFRESH_INTERVAL_SECS,
            keepalive_interval_secs: KEEPALIVE_INTERVAL_SECS,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: HISTORY_CAPACITY }
    }
}
