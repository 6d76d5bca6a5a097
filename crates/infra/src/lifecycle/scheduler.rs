//! Background lifecycle scheduler
//!
//! Keeps the session warm while the host runs: refreshes credentials on a
//! fixed cadence when a refresh token exists and emits a keepalive
//! heartbeat.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use vidsum_core::{ApiGateway, CredentialStore};
use vidsum_domain::{LifecycleConfig, Result, VidSumError};

/// Type alias for task handle to avoid complexity warnings
type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Configuration for the lifecycle scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub refresh_interval: Duration,
    pub keepalive_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from(&LifecycleConfig::default())
    }
}

impl From<&LifecycleConfig> for SchedulerConfig {
    fn from(config: &LifecycleConfig) -> Self {
        Self {
            refresh_interval: Duration::from_secs(config.refresh_interval_secs.max(1)),
            keepalive_interval: Duration::from_secs(config.keepalive_interval_secs.max(1)),
        }
    }
}

/// Periodic session refresh and keepalive
pub struct LifecycleScheduler {
    api: Arc<dyn ApiGateway>,
    credentials: Arc<dyn CredentialStore>,
    config: SchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl LifecycleScheduler {
    pub fn new(
        api: Arc<dyn ApiGateway>,
        credentials: Arc<dyn CredentialStore>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            api,
            credentials,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Install/update hook: runs once when the host starts.
    ///
    /// Returns whether a stored session was refreshed.
    #[instrument(skip(self))]
    pub async fn on_startup(&self) -> bool {
        info!(version = env!("CARGO_PKG_VERSION"), "Background host starting");
        refresh_if_signed_in(self.api.as_ref(), self.credentials.as_ref()).await
    }

    /// Start the scheduler
    ///
    /// Spawns a background task running the refresh and keepalive loops.
    ///
    /// # Errors
    ///
    /// Returns error if scheduler is already running
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> Result<()> {
        if self.is_running().await {
            return Err(VidSumError::Internal("Scheduler already running".to_string()));
        }

        info!(
            refresh_secs = self.config.refresh_interval.as_secs(),
            keepalive_secs = self.config.keepalive_interval.as_secs(),
            "Starting lifecycle scheduler"
        );

        // Fresh token so the scheduler can be restarted after stop
        self.cancellation_token = CancellationToken::new();

        let api = Arc::clone(&self.api);
        let credentials = Arc::clone(&self.credentials);
        let config = self.config.clone();
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::run_loop(api, credentials, config, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);

        Ok(())
    }

    /// Stop the scheduler gracefully
    ///
    /// Cancels the background task and awaits completion.
    ///
    /// # Errors
    ///
    /// Returns error if scheduler is not running or the task did not finish
    /// in time
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<()> {
        if !self.is_running().await {
            return Err(VidSumError::Internal("Scheduler not running".to_string()));
        }

        info!("Stopping lifecycle scheduler");
        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            match tokio::time::timeout(Duration::from_secs(5), handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("Scheduler task panicked: {}", e);
                    return Err(VidSumError::Internal("Scheduler task panicked".to_string()));
                }
                Err(_) => {
                    warn!("Scheduler task did not complete within timeout");
                    return Err(VidSumError::Internal("Scheduler task timeout".to_string()));
                }
            }
        }

        info!("Lifecycle scheduler stopped");
        Ok(())
    }

    /// A scheduler is considered running if it has an active task handle.
    pub async fn is_running(&self) -> bool {
        self.task_handle.lock().await.is_some()
    }

    async fn run_loop(
        api: Arc<dyn ApiGateway>,
        credentials: Arc<dyn CredentialStore>,
        config: SchedulerConfig,
        cancel: CancellationToken,
    ) {
        let start = Instant::now();
        let mut refresh = interval_at(start + config.refresh_interval, config.refresh_interval);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut keepalive =
            interval_at(start + config.keepalive_interval, config.keepalive_interval);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("Lifecycle loop cancelled");
                    break;
                }
                _ = refresh.tick() => {
                    refresh_if_signed_in(api.as_ref(), credentials.as_ref()).await;
                }
                _ = keepalive.tick() => {
                    debug!(uptime_secs = start.elapsed().as_secs(), "keepalive");
                }
            }
        }
    }
}

/// Ensure scheduler is stopped when dropped
impl Drop for LifecycleScheduler {
    fn drop(&mut self) {
        if !self.cancellation_token.is_cancelled() {
            self.cancellation_token.cancel();
        }
    }
}

async fn refresh_if_signed_in(api: &dyn ApiGateway, credentials: &dyn CredentialStore) -> bool {
    match credentials.get().await {
        Ok(session) if session.refresh_token.is_some() => {}
        Ok(_) => {
            debug!("No session to refresh");
            return false;
        }
        Err(err) => {
            warn!(error = %err, "Failed to read credentials for scheduled refresh");
            return false;
        }
    }

    match api.refresh_session().await {
        Ok(true) => {
            info!("Scheduled session refresh succeeded");
            true
        }
        Ok(false) => {
            warn!("Scheduled session refresh was rejected");
            false
        }
        Err(err) => {
            warn!(error = %err, "Scheduled session refresh failed");
            false
        }
    }
}
