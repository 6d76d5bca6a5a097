//! # VidSum Domain
//!
//! Business domain types for the VidSum background process.
//!
//! This crate contains:
//! - Session, job and history types
//! - RPC envelope types and the closed action set
//! - Domain error taxonomy and Result definitions
//! - Configuration structures and constants
//!
//! ## Architecture
//! - No dependencies on other VidSum crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
