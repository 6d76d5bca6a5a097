//! Credential store adapters
//!
//! - [`MemoryCredentialStore`]: process memory, lost on restart
//! - [`KeychainCredentialStore`]: platform keychain, one JSON secret per
//!   session

pub mod keychain;
pub mod memory;

use std::sync::Arc;

use vidsum_core::CredentialStore;
use vidsum_domain::{CredentialBackend, CredentialsConfig, Result};

pub use keychain::KeychainCredentialStore;
pub use memory::MemoryCredentialStore;

/// Build the store selected by configuration.
///
/// # Errors
/// Returns `VidSumError::Storage` when the keychain entry cannot be opened.
pub fn from_config(config: &CredentialsConfig) -> Result<Arc<dyn CredentialStore>> {
    Ok(match config.backend {
        CredentialBackend::Memory => Arc::new(MemoryCredentialStore::default()),
        CredentialBackend::Keychain => Arc::new(KeychainCredentialStore::open_default()?),
    })
}
