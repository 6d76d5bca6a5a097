//! Action handlers
//!
//! Each handler returns `Ok(response)` for every outcome it can describe,
//! including business failures such as a failed job. `Err` is reserved for
//! errors the dispatcher normalizes into `{ success: false, error }`.

use chrono::Utc;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;
use vidsum_domain::{
    Action, AnalysisCompleted, AnalysisRequest, BadgeHint, Credentials, ForegroundNotice, Job,
    JobStatus, Registration, Result, RpcRequest, RpcResponse, TokenGrant, VidSumError,
};

use super::dispatcher::{DispatcherInner, RpcDispatcher};

impl RpcDispatcher {
    pub(super) async fn route(&self, action: Action, request: &RpcRequest) -> Result<RpcResponse> {
        match action {
            Action::Login => self.login(request).await,
            Action::Register => self.register(request).await,
            Action::Logout => self.logout().await,
            Action::GetSession => self.get_session().await,
            Action::RefreshSession => self.refresh_session().await,
            Action::GetCurrentUser => self.get_current_user().await,
            Action::StartAnalysis => self.start_analysis(request).await,
            Action::GetTaskStatus => self.get_task_status(request).await,
            Action::AnalyzeVideo => self.analyze_video(request).await,
            Action::CancelAnalysis => self.cancel_analysis(request),
            Action::GetHistory => self.get_history().await,
            Action::ClearHistory => self.clear_history().await,
            Action::GetSummary => self.get_summary(request).await,
            Action::GetUsage => self.get_usage().await,
        }
    }

    async fn login(&self, request: &RpcRequest) -> Result<RpcResponse> {
        let credentials = Credentials {
            email: request.required_str("email")?,
            password: request.required_str("password")?,
        };

        let grant = self.inner.api.login(&credentials).await?;
        self.establish_session(grant).await
    }

    async fn register(&self, request: &RpcRequest) -> Result<RpcResponse> {
        let registration = Registration {
            email: request.required_str("email")?,
            password: request.required_str("password")?,
            name: request.optional_str("name"),
        };

        let grant = self.inner.api.register(&registration).await?;
        self.establish_session(grant).await
    }

    /// Store a fresh grant and make sure the user record is cached.
    async fn establish_session(&self, grant: TokenGrant) -> Result<RpcResponse> {
        let inner = &self.inner;
        inner.credentials.set_tokens(&grant.access_token, &grant.refresh_token).await?;

        let user = match grant.user {
            Some(user) => user,
            None => inner.api.current_user().await?,
        };
        inner.credentials.set_user(&user).await?;

        info!(user_id = user.id().unwrap_or("unknown"), "Session established");
        Ok(RpcResponse::ok().with("user", user.to_value()))
    }

    async fn logout(&self) -> Result<RpcResponse> {
        self.cancel_all_polls();
        self.inner.credentials.clear().await?;
        badge(&self.inner, BadgeHint::Clear).await;

        info!("Logged out");
        Ok(RpcResponse::ok())
    }

    async fn get_session(&self) -> Result<RpcResponse> {
        let session = self.inner.credentials.get().await?;
        let user = session.user.as_ref().map_or(Value::Null, |user| user.to_value());

        Ok(RpcResponse::ok()
            .with("authenticated", session.is_authenticated())
            .with("user", user))
    }

    async fn refresh_session(&self) -> Result<RpcResponse> {
        let refreshed = self.inner.api.refresh_session().await?;
        Ok(RpcResponse::ok().with("refreshed", refreshed))
    }

    async fn get_current_user(&self) -> Result<RpcResponse> {
        let user = self.inner.api.current_user().await?;
        self.inner.credentials.set_user(&user).await?;
        Ok(RpcResponse::ok().with("user", user.to_value()))
    }

    async fn start_analysis(&self, request: &RpcRequest) -> Result<RpcResponse> {
        let analysis = analysis_request(request)?;
        let started = self.inner.api.start_analysis(&analysis).await?;

        info!(task_id = %started.task_id, "Analysis started");
        Ok(RpcResponse::ok().with("taskId", started.task_id))
    }

    async fn get_task_status(&self, request: &RpcRequest) -> Result<RpcResponse> {
        let task_id = request.required_str("taskId")?;
        let job = self.inner.api.fetch_job(&task_id).await?;
        Ok(RpcResponse::ok().with("job", serde_json::to_value(&job)?))
    }

    /// Start an analysis and block until it is terminal, timed out or
    /// cancelled.
    async fn analyze_video(&self, request: &RpcRequest) -> Result<RpcResponse> {
        let inner = &self.inner;
        let analysis = analysis_request(request)?;
        let started = inner.api.start_analysis(&analysis).await?;
        let task_id = started.task_id;

        info!(task_id = %task_id, "Analysis started, polling to completion");
        badge(inner, BadgeHint::Working).await;

        let outcome = {
            let registration = ActivePoll::register(self, &task_id);
            inner.poller.poll(&task_id, Some(inner.notifier.as_ref()), &registration.token).await
        };

        match outcome {
            Ok(job) => self.finish_analysis(job, analysis.video_url).await,
            Err(err) => {
                let hint =
                    if err == VidSumError::Cancelled { BadgeHint::Clear } else { BadgeHint::Error };
                badge(inner, hint).await;
                Err(err)
            }
        }
    }

    async fn finish_analysis(&self, job: Job, video_url: String) -> Result<RpcResponse> {
        let inner = &self.inner;

        if job.status == JobStatus::Failed {
            let message = job.failure_message();
            warn!(task_id = %job.task_id, error = %message, "Analysis failed");
            badge(inner, BadgeHint::Error).await;
            return Ok(RpcResponse::failure(message).with("taskId", job.task_id));
        }

        let Some(result) = job.result else {
            badge(inner, BadgeHint::Error).await;
            return Err(VidSumError::Internal(format!(
                "job {} completed without a result",
                job.task_id
            )));
        };

        let event = AnalysisCompleted {
            task_id: job.task_id.clone(),
            video_url,
            result,
            completed_at: Utc::now(),
        };
        if let Err(err) = inner.history.record(&event).await {
            warn!(task_id = %event.task_id, error = %err, "Failed to record completed analysis");
        }
        badge(inner, BadgeHint::Done).await;

        info!(task_id = %event.task_id, summary_id = %event.result.summary_id, "Analysis completed");
        Ok(RpcResponse::ok()
            .with("taskId", event.task_id)
            .with("result", serde_json::to_value(&event.result)?))
    }

    fn cancel_analysis(&self, request: &RpcRequest) -> Result<RpcResponse> {
        let task_id = request.required_str("taskId")?;
        let cancelled = self.cancel_poll(&task_id);

        info!(task_id = %task_id, cancelled, "Cancel requested");
        Ok(RpcResponse::ok().with("cancelled", cancelled))
    }

    async fn get_history(&self) -> Result<RpcResponse> {
        let analyses = self.inner.history.recent().await?;
        Ok(RpcResponse::ok().with("analyses", serde_json::to_value(analyses)?))
    }

    async fn clear_history(&self) -> Result<RpcResponse> {
        self.inner.history.clear().await?;
        Ok(RpcResponse::ok())
    }

    async fn get_summary(&self, request: &RpcRequest) -> Result<RpcResponse> {
        let summary_id = request.required_str("summaryId")?;
        let summary = self.inner.api.summary(&summary_id).await?;
        Ok(RpcResponse::ok().with("summary", summary))
    }

    async fn get_usage(&self) -> Result<RpcResponse> {
        let usage = self.inner.api.usage().await?;
        Ok(RpcResponse::ok().with("usage", usage))
    }
}

/// Registration of a poll in the dispatcher's cancellation registry.
///
/// Removed on drop so that early returns and panics never leave a stale
/// entry behind.
struct ActivePoll<'a> {
    dispatcher: &'a RpcDispatcher,
    task_id: String,
    token: CancellationToken,
}

impl<'a> ActivePoll<'a> {
    fn register(dispatcher: &'a RpcDispatcher, task_id: &str) -> Self {
        let token = CancellationToken::new();
        dispatcher.inner.active_polls.insert(task_id.to_string(), token.clone());
        Self { dispatcher, task_id: task_id.to_string(), token }
    }
}

impl Drop for ActivePoll<'_> {
    fn drop(&mut self) {
        self.dispatcher.inner.active_polls.remove(&self.task_id);
    }
}

fn analysis_request(request: &RpcRequest) -> Result<AnalysisRequest> {
    let video_url = request.required_str("videoUrl")?;
    let parsed = Url::parse(&video_url)
        .map_err(|e| VidSumError::InvalidInput(format!("'videoUrl' is not a valid URL: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(VidSumError::InvalidInput("'videoUrl' must be an http(s) URL".to_string()));
    }

    Ok(AnalysisRequest { video_url, language: request.optional_str("language") })
}

async fn badge(inner: &DispatcherInner, hint: BadgeHint) {
    if let Err(err) = inner.notifier.notify(ForegroundNotice::Badge { badge: hint }).await {
        warn!(badge = %hint, error = %err, "Failed to emit badge hint");
    }
}
