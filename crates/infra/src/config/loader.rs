//! Configuration loader
//!
//! Loads the background process configuration from files and environment
//! variables.
//!
//! ## Loading Strategy
//! 1. Start from the built-in defaults
//! 2. If a config file is found, it replaces the defaults (missing fields
//!    keep their default values)
//! 3. Environment variables override individual fields
//!
//! ## Environment Variables
//! - `VIDSUM_API_BASE_URL`: API base URL
//! - `VIDSUM_API_TIMEOUT_SECS`: Per-request timeout in seconds
//! - `VIDSUM_POLL_TIMEOUT_SECS`: Hard deadline for one analysis in seconds
//! - `VIDSUM_REFRESH_INTERVAL_SECS`: Scheduled session refresh cadence
//! - `VIDSUM_KEEPALIVE_INTERVAL_SECS`: Keepalive heartbeat cadence
//! - `VIDSUM_HISTORY_CAPACITY`: Number of recent analyses kept
//! - `VIDSUM_CREDENTIAL_BACKEND`: `memory` or `keychain`
//! - `VIDSUM_LOG_FORMAT`: `pretty` or `json`
//!
//! ## File Locations
//! The loader probes `vidsum.toml` then `vidsum.json` in the current working
//! directory and each of its ancestors, then next to the executable.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use vidsum_domain::{Config, CredentialBackend, LogFormat, Result, VidSumError};

const CONFIG_FILE_NAMES: [&str; 2] = ["vidsum.toml", "vidsum.json"];

/// Load configuration: defaults, then file, then environment overrides.
///
/// # Errors
/// Returns `VidSumError::Config` if a config file exists but cannot be
/// parsed, or an environment variable holds an invalid value.
pub fn load() -> Result<Config> {
    let mut config = match probe_config_paths() {
        Some(path) => load_from_file(Some(path))?,
        None => {
            tracing::debug!("No config file found, using defaults");
            Config::default()
        }
    };

    let overridden = apply_env_overrides(&mut config)?;
    if overridden > 0 {
        tracing::info!(overridden, "Configuration overridden from environment variables");
    }

    Ok(config)
}

/// Defaults with environment overrides applied; no file is read.
///
/// # Errors
/// Returns `VidSumError::Config` if a variable holds an invalid value.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Supports JSON and
/// TOML formats (detected by file extension).
///
/// # Errors
/// Returns `VidSumError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(VidSumError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            VidSumError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| VidSumError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| VidSumError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| VidSumError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(VidSumError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_under(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(CONFIG_FILE_NAMES.iter().map(|name| exe_dir.join(name)));
        }
    }

    candidates.into_iter().find(|path| path.is_file())
}

fn candidates_under(dir: &Path) -> impl Iterator<Item = PathBuf> + '_ {
    dir.ancestors().flat_map(|ancestor| CONFIG_FILE_NAMES.iter().map(move |name| ancestor.join(name)))
}

/// Apply every `VIDSUM_*` variable that is set; returns how many were.
///
/// # Errors
/// Returns `VidSumError::Config` for unparseable values.
pub fn apply_env_overrides(config: &mut Config) -> Result<usize> {
    let mut applied = 0;
    let mut set = |present: bool| applied += usize::from(present);

    if let Some(url) = env_string("VIDSUM_API_BASE_URL") {
        config.api.base_url = url;
        set(true);
    }
    set(env_parse("VIDSUM_API_TIMEOUT_SECS", &mut config.api.timeout_secs)?);
    set(env_parse("VIDSUM_POLL_TIMEOUT_SECS", &mut config.polling.timeout_secs)?);
    set(env_parse("VIDSUM_REFRESH_INTERVAL_SECS", &mut config.lifecycle.refresh_interval_secs)?);
    set(env_parse("VIDSUM_KEEPALIVE_INTERVAL_SECS", &mut config.lifecycle.keepalive_interval_secs)?);
    set(env_parse("VIDSUM_HISTORY_CAPACITY", &mut config.history.capacity)?);

    if let Some(value) = env_string("VIDSUM_CREDENTIAL_BACKEND") {
        config.credentials.backend = match value.to_ascii_lowercase().as_str() {
            "memory" => CredentialBackend::Memory,
            "keychain" => CredentialBackend::Keychain,
            other => {
                return Err(VidSumError::Config(format!("Invalid credential backend: {other}")))
            }
        };
        set(true);
    }

    if let Some(value) = env_string("VIDSUM_LOG_FORMAT") {
        config.logging.format = match value.to_ascii_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            other => return Err(VidSumError::Config(format!("Invalid log format: {other}"))),
        };
        set(true);
    }

    Ok(applied)
}

/// Non-empty environment variable
fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Parse `key` into `target` when set; `true` if it was.
fn env_parse<T>(key: &str, target: &mut T) -> Result<bool>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = env_string(key) else {
        return Ok(false);
    };

    *target = raw
        .trim()
        .parse()
        .map_err(|e| VidSumError::Config(format!("Invalid value for {key}: {e}")))?;
    Ok(true)
}
