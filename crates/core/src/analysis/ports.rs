//! Port interfaces for the HTTP API and the foreground-facing collaborators
//!
//! These traits define the boundaries between the dispatcher/poller and the
//! infrastructure adapters that talk to the network, the foreground surface
//! and local history.

use async_trait::async_trait;
use serde_json::Value;
use vidsum_domain::{
    AnalysisCompleted, AnalysisRecord, AnalysisRequest, Credentials, ForegroundNotice, Job,
    Registration, Result, StartedJob, TokenGrant, UserRecord,
};

/// Read-only access to server-side job status
#[async_trait]
pub trait JobStatusSource: Send + Sync {
    /// Fetch the current state of a job.
    async fn fetch_job(&self, task_id: &str) -> Result<Job>;
}

/// Typed view of the HTTP API used by the action handlers
///
/// Authenticated calls transparently refresh the session once on an
/// unauthorized response; an unrecoverable session surfaces as
/// `VidSumError::SessionExpired`.
#[async_trait]
pub trait ApiGateway: JobStatusSource {
    /// Exchange credentials for a token grant. Does not touch the store.
    async fn login(&self, credentials: &Credentials) -> Result<TokenGrant>;

    /// Create an account and return its token grant. Does not touch the
    /// store.
    async fn register(&self, registration: &Registration) -> Result<TokenGrant>;

    /// Refresh the stored session; `false` when no refresh was possible.
    async fn refresh_session(&self) -> Result<bool>;

    async fn current_user(&self) -> Result<UserRecord>;

    /// Start an analysis without waiting for it.
    async fn start_analysis(&self, request: &AnalysisRequest) -> Result<StartedJob>;

    async fn summary(&self, summary_id: &str) -> Result<Value>;

    async fn usage(&self) -> Result<Value>;
}

/// One-way notification channel to the foreground surface
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: ForegroundNotice) -> Result<()>;
}

/// Consumer of completion events and source of the "recent analyses" list
#[async_trait]
pub trait HistoryRecorder: Send + Sync {
    async fn record(&self, event: &AnalysisCompleted) -> Result<()>;

    /// Most recent first.
    async fn recent(&self) -> Result<Vec<AnalysisRecord>>;

    async fn clear(&self) -> Result<()>;
}
