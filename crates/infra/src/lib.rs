//! # VidSum Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - HTTP transport with retry, plus the authenticated API client
//! - Credential stores (process memory, platform keychain)
//! - In-memory analysis history
//! - Layered configuration loading and tracing setup
//! - The lifecycle scheduler that keeps the session warm
//!
//! ## Architecture
//! - Implements traits defined in `vidsum-core`
//! - Depends on `vidsum-domain` and `vidsum-core`
//! - Contains all "impure" code (network, keychain, environment)

pub mod api;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod history;
pub mod http;
pub mod lifecycle;
pub mod logging;

// Re-export commonly used items
pub use api::{AuthenticatedClient, HttpApiGateway, RequestOptions};
pub use credentials::{KeychainCredentialStore, MemoryCredentialStore};
pub use errors::InfraError;
pub use history::InMemoryHistory;
pub use http::{HttpClient, HttpClientBuilder};
pub use lifecycle::{LifecycleScheduler, SchedulerConfig};
pub use logging::init_tracing;
