//! Authenticated API client
//!
//! Attaches the stored bearer token to every call and recovers from an
//! expired access token by refreshing the session once and replaying the
//! call. Concurrent refreshes for the same refresh token share one network
//! round trip.

use std::sync::Arc;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use vidsum_core::CredentialStore;
use vidsum_domain::constants::ENDPOINT_REFRESH;
use vidsum_domain::{Result, TokenGrant, VidSumError};

use crate::http::HttpClient;

/// Per-call options for [`AuthenticatedClient::request`]
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    /// Merged over the default JSON content-type header.
    pub headers: HeaderMap,
    /// When fired, the in-flight call is abandoned with `Cancelled`.
    pub cancel: Option<CancellationToken>,
    /// Skip the bearer token and the refresh-on-401 path (login, register).
    pub anonymous: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::get()
    }
}

impl RequestOptions {
    #[must_use]
    pub fn get() -> Self {
        Self {
            method: Method::GET,
            body: None,
            headers: HeaderMap::new(),
            cancel: None,
            anonymous: false,
        }
    }

    #[must_use]
    pub fn post(body: Value) -> Self {
        Self { method: Method::POST, body: Some(body), ..Self::get() }
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    #[must_use]
    pub const fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }
}

type RefreshOutcome = Shared<BoxFuture<'static, bool>>;

/// A refresh started with `refresh_token`; cleared once it settles.
struct RefreshFlight {
    refresh_token: String,
    outcome: RefreshOutcome,
}

/// HTTP client bound to the credential store
pub struct AuthenticatedClient {
    http: HttpClient,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
    refresh_flight: Mutex<Option<RefreshFlight>>,
}

impl AuthenticatedClient {
    pub fn new(http: HttpClient, base_url: &str, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            refresh_flight: Mutex::new(None),
        }
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    /// Perform one API call and decode its JSON body.
    ///
    /// A 401 triggers one refresh. When the refresh succeeds the call is
    /// replayed once with the new token; when it fails the session is
    /// cleared and `SessionExpired` is returned.
    ///
    /// # Errors
    /// - `VidSumError::SessionExpired` when the session cannot be recovered
    /// - `VidSumError::Api` for any other non-2xx status, carrying the
    ///   server's `detail` when present
    /// - `VidSumError::Network` for transport failures
    /// - `VidSumError::Cancelled` when `options.cancel` fires first
    #[instrument(skip(self, options), fields(method = %options.method))]
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T> {
        match options.cancel.clone() {
            Some(cancel) => tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("Request cancelled");
                    Err(VidSumError::Cancelled)
                }
                outcome = self.request_once(endpoint, &options) => outcome,
            },
            None => self.request_once(endpoint, &options).await,
        }
    }

    async fn request_once<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: &RequestOptions,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        let (response, sent_token) = self.execute(&url, options).await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED && !options.anonymous {
            debug!(url = %url, "Unauthorized response, refreshing session");

            if self.refresh_after_rejection(sent_token).await? {
                let (retry, _) = self.execute(&url, options).await?;
                let retry_status = retry.status();
                if !retry_status.is_success() {
                    warn!(url = %url, status = %retry_status, "Request failed after token refresh");
                    return Err(VidSumError::api(retry_status.as_u16()));
                }
                return decode_body(retry).await;
            }

            warn!("Session could not be refreshed, clearing credentials");
            if let Err(err) = self.credentials.clear().await {
                warn!(error = %err, "Failed to clear credentials after refresh failure");
            }
            return Err(VidSumError::SessionExpired);
        }

        if !status.is_success() {
            return Err(error_from_response(response).await);
        }

        debug!(url = %url, status = %status, "Request successful");
        decode_body(response).await
    }

    /// Refresh after `rejected_token` got a 401, unless a concurrent caller
    /// already replaced it.
    async fn refresh_after_rejection(&self, rejected_token: Option<String>) -> Result<bool> {
        let current = self.credentials.get().await?.access_token;
        if current.is_some() && current != rejected_token {
            debug!("Access token already replaced by a concurrent refresh");
            return Ok(true);
        }
        Ok(self.refresh().await)
    }

    /// Send one attempt; also returns the access token it carried.
    async fn execute(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> Result<(Response, Option<String>)> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in &options.headers {
            headers.insert(name.clone(), value.clone());
        }

        let mut builder = self.http.request(options.method.clone(), url).headers(headers);

        let token =
            if options.anonymous { None } else { self.credentials.get().await?.access_token };
        if let Some(token) = &token {
            builder = builder.bearer_auth(token);
        }

        if let Some(body) = &options.body {
            builder = builder.json(body);
        }

        let response = self.http.send(builder).await?;
        Ok((response, token))
    }

    /// Exchange the stored refresh token for a new token pair.
    ///
    /// Never fails: a missing refresh token, a rejected refresh and a
    /// network failure all yield `false` and leave the session untouched.
    pub async fn refresh(&self) -> bool {
        let refresh_token = match self.credentials.get().await {
            Ok(session) => session.refresh_token,
            Err(err) => {
                warn!(error = %err, "Failed to read credentials for refresh");
                return false;
            }
        };

        let Some(refresh_token) = refresh_token else {
            debug!("No refresh token available");
            return false;
        };

        let outcome = {
            let mut flight = self.refresh_flight.lock();
            match flight.as_ref() {
                Some(current)
                    if current.refresh_token == refresh_token && current.outcome.peek().is_none() =>
                {
                    debug!("Joining refresh already started for this token");
                    current.outcome.clone()
                }
                _ => {
                    let outcome = run_refresh(
                        self.http.clone(),
                        format!("{}{}", self.base_url, ENDPOINT_REFRESH),
                        Arc::clone(&self.credentials),
                        refresh_token.clone(),
                    )
                    .boxed()
                    .shared();
                    *flight = Some(RefreshFlight { refresh_token, outcome: outcome.clone() });
                    outcome
                }
            }
        };

        let refreshed = outcome.clone().await;

        // A settled flight is never reused: the next refresh hits the network.
        let mut flight = self.refresh_flight.lock();
        if flight.as_ref().is_some_and(|current| current.outcome.ptr_eq(&outcome)) {
            *flight = None;
        }

        refreshed
    }
}

async fn run_refresh(
    http: HttpClient,
    url: String,
    credentials: Arc<dyn CredentialStore>,
    refresh_token: String,
) -> bool {
    let request = http.request(Method::POST, &url).json(&json!({ "refresh_token": refresh_token }));

    let response = match http.send(request).await {
        Ok(response) => response,
        Err(err) => {
            warn!(error = %err, "Token refresh request failed");
            return false;
        }
    };

    let status = response.status();
    if !status.is_success() {
        warn!(status = %status, "Token refresh rejected");
        return false;
    }

    let grant: TokenGrant = match response.json().await {
        Ok(grant) => grant,
        Err(err) => {
            warn!(error = %err, "Token refresh returned an unreadable body");
            return false;
        }
    };

    if let Err(err) = credentials.set_tokens(&grant.access_token, &grant.refresh_token).await {
        warn!(error = %err, "Failed to store refreshed tokens");
        return false;
    }
    if let Some(user) = &grant.user {
        if let Err(err) = credentials.set_user(user).await {
            warn!(error = %err, "Failed to store refreshed user record");
        }
    }

    info!("Session refreshed");
    true
}

async fn decode_body<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| VidSumError::Network(format!("Failed to read response body: {e}")))?;

    // 204/205 carry no body by definition; some endpoints also answer 200
    // with an empty body.
    if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT || bytes.is_empty()
    {
        return serde_json::from_value(Value::Null).map_err(|_| {
            VidSumError::Serialization(format!(
                "empty response ({}) cannot be decoded into the expected type",
                status.as_u16()
            ))
        });
    }

    Ok(serde_json::from_slice(&bytes)?)
}

async fn error_from_response(response: Response) -> VidSumError {
    let status = response.status().as_u16();
    let detail = response
        .json::<Value>()
        .await
        .ok()
        .and_then(|body| body.get("detail").and_then(Value::as_str).map(str::to_string));

    debug!(status, detail = detail.as_deref().unwrap_or(""), "API returned an error status");
    VidSumError::Api { status, detail }
}
