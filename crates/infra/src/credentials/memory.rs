use async_trait::async_trait;
use tokio::sync::RwLock;
use vidsum_core::CredentialStore;
use vidsum_domain::{Result, Session, UserRecord};

/// Credential store kept in process memory
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    session: RwLock<Session>,
}

impl MemoryCredentialStore {
    pub fn with_session(session: Session) -> Self {
        Self { session: RwLock::new(session) }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self) -> Result<Session> {
        Ok(self.session.read().await.clone())
    }

    async fn set_tokens(&self, access_token: &str, refresh_token: &str) -> Result<()> {
        let mut session = self.session.write().await;
        session.access_token = Some(access_token.to_string());
        session.refresh_token = Some(refresh_token.to_string());
        Ok(())
    }

    async fn set_user(&self, user: &UserRecord) -> Result<()> {
        let mut session = self.session.write().await;
        if session.is_authenticated() {
            session.user = Some(user.clone());
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.session.write().await = Session::default();
        Ok(())
    }
}
