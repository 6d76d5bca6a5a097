//! Job poller with adaptive backoff
//!
//! The server offers no push channel, so a started analysis is followed by
//! polling its status until it reaches a terminal state. The interval widens
//! with elapsed time, a hard deadline bounds the total wait, and a
//! cancellation token can stop the loop at any suspension point.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use vidsum_domain::constants::{POLL_INTERVAL_SLOWEST, POLL_SCHEDULE, POLL_TIMEOUT};
use vidsum_domain::{ForegroundNotice, Job, PollingConfig, ProgressEvent, Result, VidSumError};

use super::ports::{JobStatusSource, Notifier};

/// Poller configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    /// Hard deadline measured from the start of `poll`.
    pub timeout: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self { timeout: POLL_TIMEOUT }
    }
}

impl From<&PollingConfig> for PollerConfig {
    fn from(config: &PollingConfig) -> Self {
        Self { timeout: Duration::from_secs(config.timeout_secs) }
    }
}

/// Delay before the next status fetch given the time spent polling so far.
///
/// Monotonic in `elapsed`: the interval only ever widens.
#[must_use]
pub fn next_poll_interval(elapsed: Duration) -> Duration {
    POLL_SCHEDULE
        .iter()
        .find(|(upper, _)| elapsed <= *upper)
        .map_or(POLL_INTERVAL_SLOWEST, |(_, interval)| *interval)
}

/// Polls one job at a time until it is terminal, times out, or is cancelled
pub struct JobPoller<S: JobStatusSource + ?Sized> {
    source: Arc<S>,
    config: PollerConfig,
}

impl<S: JobStatusSource + ?Sized> JobPoller<S> {
    pub fn new(source: Arc<S>, config: PollerConfig) -> Self {
        Self { source, config }
    }

    #[must_use]
    pub const fn config(&self) -> PollerConfig {
        self.config
    }

    /// Poll `task_id` until it reaches `completed` or `failed`.
    ///
    /// A `failed` job is returned as `Ok`: it is a business outcome, not a
    /// polling error. Progress is relayed to `progress` best-effort; a
    /// failing notifier never aborts polling.
    ///
    /// # Errors
    /// - `VidSumError::AnalysisTimeout` when the deadline passes first
    /// - `VidSumError::Cancelled` when `cancel` fires
    /// - any non-transient error from the status source
    #[instrument(skip(self, progress, cancel), fields(timeout_secs = self.config.timeout.as_secs()))]
    pub async fn poll(
        &self,
        task_id: &str,
        progress: Option<&dyn Notifier>,
        cancel: &CancellationToken,
    ) -> Result<Job> {
        let started = Instant::now();
        // A timeout past the clock's range never expires.
        let deadline = started.checked_add(self.config.timeout);
        let mut attempts: u32 = 0;

        while deadline.map_or(true, |deadline| Instant::now() < deadline) {
            if cancel.is_cancelled() {
                return Err(cancelled(task_id));
            }

            attempts += 1;
            let observed = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(cancelled(task_id)),
                observed = self.source.fetch_job(task_id) => observed,
            };

            match observed {
                Ok(mut job) => {
                    if job.task_id.is_empty() {
                        job.task_id = task_id.to_string();
                    }

                    if job.is_terminal() {
                        info!(
                            attempts,
                            status = %job.status,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "Job reached terminal status"
                        );
                        return Ok(job);
                    }

                    if let Some(sink) = progress {
                        emit_progress(sink, &job).await;
                    }
                }
                Err(err) if err.is_transient() => {
                    warn!(attempts, error = %err, "Transient error while polling job status");
                }
                Err(err) => return Err(err),
            }

            let interval = next_poll_interval(started.elapsed());
            debug!(attempts, interval_ms = interval.as_millis() as u64, "Job not terminal yet");

            if cancel.is_cancelled() {
                return Err(cancelled(task_id));
            }
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(cancelled(task_id)),
                () = tokio::time::sleep(interval) => {}
            }
        }

        warn!(attempts, "Job did not reach a terminal status before the deadline");
        Err(VidSumError::AnalysisTimeout)
    }
}

async fn emit_progress(sink: &dyn Notifier, job: &Job) {
    let event = ProgressEvent {
        task_id: job.task_id.clone(),
        progress: job.progress_percent(),
        message: job.message.clone(),
    };

    if let Err(err) = sink.notify(ForegroundNotice::Progress(event)).await {
        debug!(error = %err, "Dropping progress notification");
    }
}

fn cancelled(task_id: &str) -> VidSumError {
    info!(task_id, "Polling cancelled");
    VidSumError::Cancelled
}
