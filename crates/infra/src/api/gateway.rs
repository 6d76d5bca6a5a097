//! HTTP implementation of the API gateway port

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;
use urlencoding::encode;
use vidsum_core::{ApiGateway, JobStatusSource};
use vidsum_domain::constants::{
    ENDPOINT_ANALYSIS_STATUS, ENDPOINT_CURRENT_USER, ENDPOINT_LOGIN, ENDPOINT_REGISTER,
    ENDPOINT_START_ANALYSIS, ENDPOINT_SUMMARIES, ENDPOINT_USAGE,
};
use vidsum_domain::{
    AnalysisRequest, Credentials, Job, Registration, Result, StartedJob, TokenGrant, UserRecord,
    VidSumError,
};

use super::auth_client::{AuthenticatedClient, RequestOptions};

/// Typed endpoints on top of [`AuthenticatedClient`]
pub struct HttpApiGateway {
    client: Arc<AuthenticatedClient>,
}

impl HttpApiGateway {
    pub const fn new(client: Arc<AuthenticatedClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<AuthenticatedClient> {
        &self.client
    }
}

#[async_trait]
impl JobStatusSource for HttpApiGateway {
    #[instrument(skip(self))]
    async fn fetch_job(&self, task_id: &str) -> Result<Job> {
        let endpoint = format!("{ENDPOINT_ANALYSIS_STATUS}/{}", path_segment("taskId", task_id)?);
        self.client.request(&endpoint, RequestOptions::get()).await
    }
}

#[async_trait]
impl ApiGateway for HttpApiGateway {
    #[instrument(skip_all)]
    async fn login(&self, credentials: &Credentials) -> Result<TokenGrant> {
        let body = serde_json::to_value(credentials)?;
        self.client.request(ENDPOINT_LOGIN, RequestOptions::post(body).anonymous()).await
    }

    #[instrument(skip_all)]
    async fn register(&self, registration: &Registration) -> Result<TokenGrant> {
        let body = serde_json::to_value(registration)?;
        self.client.request(ENDPOINT_REGISTER, RequestOptions::post(body).anonymous()).await
    }

    async fn refresh_session(&self) -> Result<bool> {
        Ok(self.client.refresh().await)
    }

    async fn current_user(&self) -> Result<UserRecord> {
        self.client.request(ENDPOINT_CURRENT_USER, RequestOptions::get()).await
    }

    #[instrument(skip_all, fields(video_url = %request.video_url))]
    async fn start_analysis(&self, request: &AnalysisRequest) -> Result<StartedJob> {
        let body = serde_json::to_value(request)?;
        self.client.request(ENDPOINT_START_ANALYSIS, RequestOptions::post(body)).await
    }

    async fn summary(&self, summary_id: &str) -> Result<Value> {
        let endpoint = format!("{ENDPOINT_SUMMARIES}/{}", path_segment("summaryId", summary_id)?);
        self.client.request(&endpoint, RequestOptions::get()).await
    }

    async fn usage(&self) -> Result<Value> {
        self.client.request(ENDPOINT_USAGE, RequestOptions::get()).await
    }
}

/// Percent-encode a caller-supplied id so it stays one path segment.
///
/// Dot segments survive encoding and would be collapsed by URL
/// normalization, so they are refused outright.
fn path_segment(name: &str, id: &str) -> Result<String> {
    if matches!(id, "" | "." | "..") {
        return Err(VidSumError::InvalidInput(format!("'{name}' is not a valid identifier")));
    }
    Ok(encode(id).into_owned())
}
