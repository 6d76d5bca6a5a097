//! Port interface for the credential store
//!
//! The store is an opaque key-value collaborator; its persistence format is
//! owned by the adapter.

use async_trait::async_trait;
use vidsum_domain::{Result, Session, UserRecord};

/// Storage for the access/refresh token pair and the cached user
///
/// Implementations must be safe to call from concurrently dispatched
/// handlers. Every write replaces whole fields (last writer wins).
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Current session; an empty `Session` when logged out.
    async fn get(&self) -> Result<Session>;

    /// Replace the token pair.
    async fn set_tokens(&self, access_token: &str, refresh_token: &str) -> Result<()>;

    /// Replace the cached user record of a signed-in session.
    ///
    /// Does nothing once the session holds no access token, so a profile
    /// fetched before a logout cannot repopulate the cleared store.
    async fn set_user(&self, user: &UserRecord) -> Result<()>;

    /// Null every session field.
    async fn clear(&self) -> Result<()>;
}
