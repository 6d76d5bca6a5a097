//! Application context - dependency injection container

use std::sync::Arc;

use vidsum_core::rpc::DispatcherDeps;
use vidsum_core::{CredentialStore, Notifier, PollerConfig, RpcDispatcher};
use vidsum_domain::{Config, Result};
use vidsum_infra::{
    credentials, AuthenticatedClient, HttpApiGateway, HttpClient, InMemoryHistory,
    LifecycleScheduler, SchedulerConfig,
};

/// Application context - holds the adapters and the dispatcher built over
/// them
pub struct AppContext {
    pub config: Config,
    pub credentials: Arc<dyn CredentialStore>,
    pub api: Arc<HttpApiGateway>,
    pub history: Arc<InMemoryHistory>,
    pub dispatcher: RpcDispatcher,
}

impl AppContext {
    /// Wire every adapter selected by `config`.
    ///
    /// # Errors
    /// Fails when the credential store or the HTTP client cannot be built.
    pub fn new(config: Config, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let credentials = credentials::from_config(&config.credentials)?;
        Self::with_credentials(config, credentials, notifier)
    }

    /// Same as [`AppContext::new`] with an explicit credential store.
    ///
    /// # Errors
    /// Fails when the HTTP client cannot be built.
    pub fn with_credentials(
        config: Config,
        credentials: Arc<dyn CredentialStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let http = HttpClient::from_config(&config.api)?;
        let client = Arc::new(AuthenticatedClient::new(
            http,
            &config.api.base_url,
            credentials.clone(),
        ));
        let api = Arc::new(HttpApiGateway::new(client));
        let history = Arc::new(InMemoryHistory::from_config(&config.history));

        let dispatcher = RpcDispatcher::new(DispatcherDeps {
            api: api.clone(),
            credentials: credentials.clone(),
            notifier,
            history: history.clone(),
            poller: PollerConfig::from(&config.polling),
        });

        tracing::info!(
            base_url = %config.api.base_url,
            backend = ?config.credentials.backend,
            "Application context initialized"
        );

        Ok(Self { config, credentials, api, history, dispatcher })
    }

    /// Scheduler that keeps this context's session warm.
    pub fn scheduler(&self) -> LifecycleScheduler {
        LifecycleScheduler::new(
            self.api.clone(),
            self.credentials.clone(),
            SchedulerConfig::from(&self.config.lifecycle),
        )
    }
}
