//! Application constants
//!
//! Centralized location for the wire endpoints, polling schedule and
//! lifecycle cadences used throughout the background process.

use std::time::Duration;

// API endpoints (relative to the configured base URL)
pub const ENDPOINT_LOGIN: &str = "/auth/login";
pub const ENDPOINT_REGISTER: &str = "/auth/register";
pub const ENDPOINT_REFRESH: &str = "/auth/refresh";
pub const ENDPOINT_CURRENT_USER: &str = "/auth/me";
pub const ENDPOINT_START_ANALYSIS: &str = "/analysis/start";
pub const ENDPOINT_ANALYSIS_STATUS: &str = "/analysis/status";
pub const ENDPOINT_SUMMARIES: &str = "/summaries";
pub const ENDPOINT_USAGE: &str = "/users/usage";

// Job polling
pub const POLL_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Adaptive poll schedule: `(elapsed upper bound inclusive, interval)`.
/// Anything past the last bound uses [`POLL_INTERVAL_SLOWEST`].
pub const POLL_SCHEDULE: [(Duration, Duration); 3] = [
    (Duration::from_secs(30), Duration::from_millis(2000)),
    (Duration::from_secs(2 * 60), Duration::from_millis(3000)),
    (Duration::from_secs(5 * 60), Duration::from_millis(5000)),
];
pub const POLL_INTERVAL_SLOWEST: Duration = Duration::from_millis(8000);

// Background lifecycle
pub const REFRESH_INTERVAL_SECS: u64 = 14 * 60;
pub const KEEPALIVE_INTERVAL_SECS: u64 = 20;

// Recent analyses
pub const HISTORY_CAPACITY: usize = 20;

// HTTP
pub const DEFAULT_API_BASE_URL: &str = "https://api.vidsum.app/api/v1";
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HTTP_MAX_ATTEMPTS: usize = 3;

// Keychain
pub const KEYCHAIN_SERVICE: &str = "VidSum.background";
pub const KEYCHAIN_ACCOUNT: &str = "session";
