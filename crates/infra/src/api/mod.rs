//! HTTP API client for the VidSum backend
//!
//! This module provides the authenticated client and the typed gateway the
//! dispatcher talks to.
//!
//! # Architecture
//!
//! - Uses [`crate::http::HttpClient`] (no direct reqwest clients)
//! - Bearer authentication with refresh-once on 401
//! - Single-flight refresh shared by concurrent callers
//! - Structured tracing only

pub mod auth_client;
pub mod gateway;

pub use auth_client::{AuthenticatedClient, RequestOptions};
pub use gateway::HttpApiGateway;
