//! Platform keychain credential store
//!
//! The whole session is serialized as one JSON secret under a single
//! keychain entry, so every write replaces the record atomically from the
//! keychain's point of view.

use std::sync::Arc;

use async_trait::async_trait;
use keyring::Entry;
use parking_lot::Mutex;
use tracing::debug;
use vidsum_core::CredentialStore;
use vidsum_domain::constants::{KEYCHAIN_ACCOUNT, KEYCHAIN_SERVICE};
use vidsum_domain::{Result, Session, UserRecord, VidSumError};

use crate::errors::InfraError;

/// Credential store backed by macOS Keychain, Windows Credential Manager or
/// the Linux kernel keyring
///
/// Keychain calls block (and may wait on an OS unlock prompt), so each one
/// runs on the blocking pool instead of a runtime worker.
pub struct KeychainCredentialStore {
    keychain: Arc<Keychain>,
}

struct Keychain {
    service: String,
    entry: Entry,
    /// Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl KeychainCredentialStore {
    /// Open the entry `account` of keychain service `service`.
    ///
    /// # Errors
    /// Returns `VidSumError::Storage` if the platform rejects the entry.
    pub fn open(service: &str, account: &str) -> Result<Self> {
        let entry = Entry::new(service, account).map_err(InfraError::from)?;
        let keychain = Keychain { service: service.to_string(), entry, write_lock: Mutex::new(()) };
        Ok(Self { keychain: Arc::new(keychain) })
    }

    /// Open the entry used by the background process.
    ///
    /// # Errors
    /// Returns `VidSumError::Storage` if the platform rejects the entry.
    pub fn open_default() -> Result<Self> {
        Self::open(KEYCHAIN_SERVICE, KEYCHAIN_ACCOUNT)
    }

    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Keychain) -> Result<T> + Send + 'static,
    {
        let keychain = Arc::clone(&self.keychain);
        tokio::task::spawn_blocking(move || op(&keychain))
            .await
            .map_err(|e| VidSumError::Internal(format!("keychain task failed: {e}")))?
    }
}

impl Keychain {
    fn load(&self) -> Result<Session> {
        match self.entry.get_password() {
            Ok(secret) => serde_json::from_str(&secret).map_err(|e| {
                VidSumError::Storage(format!("stored session is not valid JSON: {e}"))
            }),
            Err(keyring::Error::NoEntry) => Ok(Session::default()),
            Err(err) => Err(InfraError::from(err).into()),
        }
    }

    fn save(&self, session: &Session) -> Result<()> {
        if session.is_empty() {
            return self.delete();
        }

        let secret = serde_json::to_string(session)?;
        self.entry.set_password(&secret).map_err(InfraError::from)?;
        debug!(service = %self.service, "Session stored in keychain");
        Ok(())
    }

    fn delete(&self) -> Result<()> {
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {
                debug!(service = %self.service, "Session removed from keychain");
                Ok(())
            }
            Err(err) => Err(InfraError::from(err).into()),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut Session)) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut session = self.load()?;
        apply(&mut session);
        self.save(&session)
    }
}

#[async_trait]
impl CredentialStore for KeychainCredentialStore {
    async fn get(&self) -> Result<Session> {
        self.run(Keychain::load).await
    }

    async fn set_tokens(&self, access_token: &str, refresh_token: &str) -> Result<()> {
        let access_token = access_token.to_string();
        let refresh_token = refresh_token.to_string();
        self.run(move |keychain| {
            keychain.update(|session| {
                session.access_token = Some(access_token);
                session.refresh_token = Some(refresh_token);
            })
        })
        .await
    }

    async fn set_user(&self, user: &UserRecord) -> Result<()> {
        let user = user.clone();
        self.run(move |keychain| {
            keychain.update(|session| {
                if session.is_authenticated() {
                    session.user = Some(user);
                }
            })
        })
        .await
    }

    async fn clear(&self) -> Result<()> {
        self.run(|keychain| {
            let _guard = keychain.write_lock.lock();
            keychain.delete()
        })
        .await
    }
}
