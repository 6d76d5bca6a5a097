//! Shared test helpers for `vidsum-core` integration tests.
//!
//! These helpers provide in-memory collaborators so that dispatcher tests can
//! focus on behaviour instead of boilerplate.

#![allow(dead_code)]

pub mod collaborators;
pub mod gateway;

use std::sync::Arc;

use vidsum_core::rpc::DispatcherDeps;
use vidsum_core::{ApiGateway, CredentialStore, HistoryRecorder, Notifier, PollerConfig};

pub use collaborators::{
    FailingCredentials, FailingHistory, FailingNotifier, MemoryCredentials, MemoryHistory,
    RecordingNotifier,
};
pub use gateway::{FailingGateway, MockGateway, PanickingGateway, SigningOutGateway};

/// Wire a dispatcher dependency set from concrete mocks.
pub fn deps(
    api: Arc<dyn ApiGateway>,
    credentials: Arc<dyn CredentialStore>,
    notifier: Arc<dyn Notifier>,
    history: Arc<dyn HistoryRecorder>,
) -> DispatcherDeps {
    DispatcherDeps { api, credentials, notifier, history, poller: PollerConfig::default() }
}
