use std::time::Duration;

use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tracing::debug;
use vidsum_domain::constants::{DEFAULT_API_TIMEOUT_SECS, DEFAULT_HTTP_MAX_ATTEMPTS};
use vidsum_domain::{ApiConfig, VidSumError};

use crate::errors::InfraError;

/// Longest backoff step, as a power of two of the base delay.
const MAX_BACKOFF_SHIFT: u32 = 6;

/// HTTP transport shared by the authenticated client and token refresh
///
/// Replays a request only when doing so cannot repeat a side effect:
/// idempotent methods are retried on 5xx, timeouts and connection errors;
/// every other method (starting an analysis, exchanging a refresh token) is
/// retried only when the connection could not be opened at all. Any other
/// status, 401 included, is returned on the first attempt.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    max_attempts: usize,
    base_backoff: Duration,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Client configured from the `[api]` section.
    ///
    /// # Errors
    /// Returns `VidSumError::Network` when the TLS backend cannot be set up.
    pub fn from_config(config: &ApiConfig) -> Result<Self, VidSumError> {
        Self::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .max_attempts(config.max_attempts)
            .user_agent(concat!("vidsum-background/", env!("CARGO_PKG_VERSION")))
            .build()
    }

    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Send `builder`, replaying it while the retry policy allows.
    ///
    /// # Errors
    /// - `VidSumError::Network` for a transport failure on the last attempt
    /// - `VidSumError::Internal` when the request cannot be built or cloned
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, VidSumError> {
        let mut attempt = 1;

        loop {
            let request = builder
                .try_clone()
                .ok_or_else(|| VidSumError::Internal("streaming request bodies cannot be sent".into()))?
                .build()
                .map_err(InfraError::from)?;
            let method = request.method().clone();
            let url = request.url().clone();
            let may_retry = attempt < self.max_attempts;

            debug!(attempt, %method, %url, "Sending HTTP request");

            match self.client.execute(request).await {
                Ok(response) => {
                    let status = response.status();
                    if !(may_retry && status.is_server_error() && method.is_idempotent()) {
                        debug!(attempt, %method, %url, %status, "HTTP response");
                        return Ok(response);
                    }
                    debug!(attempt, %method, %url, %status, "Server error, retrying");
                }
                Err(err) => {
                    if !(may_retry && is_replayable_failure(&method, &err)) {
                        return Err(InfraError::from(err).into());
                    }
                    debug!(attempt, %method, %url, error = %err, "Transport failure, retrying");
                }
            }

            let delay = self.backoff_delay(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }

    /// Delay before retry number `retry` (1-based); doubles each time.
    fn backoff_delay(&self, retry: usize) -> Duration {
        let shift = u32::try_from(retry.saturating_sub(1)).unwrap_or(u32::MAX).min(MAX_BACKOFF_SHIFT);
        self.base_backoff.saturating_mul(1 << shift)
    }
}

/// A connection that never opened sent nothing, so any method may be
/// replayed; a timeout may have reached the server.
fn is_replayable_failure(method: &Method, err: &reqwest::Error) -> bool {
    err.is_connect() || (method.is_idempotent() && (err.is_timeout() || err.is_request()))
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
    user_agent: Option<String>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_API_TIMEOUT_SECS),
            max_attempts: DEFAULT_HTTP_MAX_ATTEMPTS,
            base_backoff: Duration::from_millis(200),
            user_agent: None,
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total attempts including the first one; at least 1.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// # Errors
    /// Returns `VidSumError::Network` when reqwest cannot build its client.
    pub fn build(self) -> Result<HttpClient, VidSumError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();
        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        Ok(HttpClient {
            client: builder.build().map_err(InfraError::from)?,
            max_attempts: self.max_attempts.max(1),
            base_backoff: self.base_backoff,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use reqwest::StatusCode;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(attempts: usize) -> HttpClient {
        HttpClient::builder()
            .base_backoff(Duration::from_millis(1))
            .max_attempts(attempts)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_success_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/usage"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(3);
        let url = format!("{}/users/usage", server.uri());
        let response = client.send(client.request(Method::GET, url)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_status_poll_retries_server_errors_until_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/analysis/status/t-1"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/analysis/status/t-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "queued"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(3);
        let url = format!("{}/analysis/status/t-1", server.uri());
        let response = client.send(client.request(Method::GET, url)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_last_server_error_is_returned_when_attempts_run_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .expect(2)
            .mount(&server)
            .await;

        let client = client(2);
        let response = client.send(client.request(Method::GET, server.uri())).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_unauthorized_is_handed_back_immediately() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(3);
        let response = client.send(client.request(Method::GET, server.uri())).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_starting_an_analysis_is_sent_once_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analysis/start"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(3);
        let url = format!("{}/analysis/start", server.uri());
        let request = client.request(Method::POST, url).json(&json!({"video_url": "https://youtu.be/x"}));
        let response = client.send(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_refresh_exchange_is_not_replayed_after_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::builder()
            .timeout(Duration::from_millis(50))
            .base_backoff(Duration::from_millis(1))
            .max_attempts(3)
            .build()
            .unwrap();
        let url = format!("{}/auth/refresh", server.uri());
        let request = client.request(Method::POST, url).json(&json!({"refresh_token": "r"}));

        assert!(matches!(client.send(request).await, Err(VidSumError::Network(_))));
    }

    #[tokio::test]
    async fn test_refused_connection_surfaces_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/auth/refresh", listener.local_addr().unwrap());
        drop(listener);

        let client = client(2);
        let result = client.send(client.request(Method::POST, &url)).await;

        assert!(matches!(result, Err(VidSumError::Network(_))), "got {result:?}");
    }

    #[test]
    fn test_backoff_doubles_and_is_capped() {
        let client = HttpClient::builder().base_backoff(Duration::from_millis(100)).build().unwrap();

        assert_eq!(client.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(client.backoff_delay(2), Duration::from_millis(200));
        assert_eq!(client.backoff_delay(3), Duration::from_millis(400));
        assert_eq!(client.backoff_delay(50), Duration::from_millis(6400));
    }
}
