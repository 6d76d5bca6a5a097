//! # VidSum Core
//!
//! Orchestration logic of the background process - no infrastructure
//! dependencies.
//!
//! This crate contains:
//! - Port interfaces (traits) for every external collaborator
//! - The job poller (adaptive backoff, hard deadline, cancellation)
//! - The RPC dispatcher and its action handlers
//!
//! ## Architecture Principles
//! - Only depends on `vidsum-domain`
//! - No HTTP, keychain or platform code
//! - All external dependencies via traits
//! - Pure, testable orchestration

pub mod analysis;
pub mod rpc;
pub mod session;

// Re-export specific items to avoid ambiguity
pub use analysis::poller::{next_poll_interval, JobPoller, PollerConfig};
pub use analysis::ports::{ApiGateway, HistoryRecorder, JobStatusSource, Notifier};
pub use rpc::{Inbound, RpcDispatcher};
pub use session::ports::CredentialStore;
