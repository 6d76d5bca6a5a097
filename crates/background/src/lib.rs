//! # VidSum Background
//!
//! Host process for the background core.
//!
//! This crate contains:
//! - Application context (dependency injection)
//! - The stdio transport the foreground talks to
//! - Main entry point and shutdown handling
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Wires up the hexagonal architecture

pub mod context;
pub mod transport;

pub use context::AppContext;
pub use transport::{ChannelNotifier, InboundFrame, OutboundFrame};
