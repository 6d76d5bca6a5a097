//! In-memory credential store, notifier and history mocks

use std::sync::Mutex;

use async_trait::async_trait;
use vidsum_core::{CredentialStore, HistoryRecorder, Notifier};
use vidsum_domain::{
    AnalysisCompleted, AnalysisRecord, BadgeHint, ForegroundNotice, Result as DomainResult,
    Session, UserRecord, VidSumError,
};

/// Credential store backed by a plain `Session`.
#[derive(Default)]
pub struct MemoryCredentials {
    session: Mutex<Session>,
}

impl MemoryCredentials {
    pub fn with_session(session: Session) -> Self {
        Self { session: Mutex::new(session) }
    }

    pub fn snapshot(&self) -> Session {
        self.session.lock().unwrap().clone()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentials {
    async fn get(&self) -> DomainResult<Session> {
        Ok(self.snapshot())
    }

    async fn set_tokens(&self, access_token: &str, refresh_token: &str) -> DomainResult<()> {
        let mut session = self.session.lock().unwrap();
        session.access_token = Some(access_token.to_string());
        session.refresh_token = Some(refresh_token.to_string());
        Ok(())
    }

    async fn set_user(&self, user: &UserRecord) -> DomainResult<()> {
        let mut session = self.session.lock().unwrap();
        if session.is_authenticated() {
            session.user = Some(user.clone());
        }
        Ok(())
    }

    async fn clear(&self) -> DomainResult<()> {
        *self.session.lock().unwrap() = Session::default();
        Ok(())
    }
}

/// Credential store whose every operation fails.
pub struct FailingCredentials;

#[async_trait]
impl CredentialStore for FailingCredentials {
    async fn get(&self) -> DomainResult<Session> {
        Err(VidSumError::Storage("store unavailable".into()))
    }

    async fn set_tokens(&self, _access_token: &str, _refresh_token: &str) -> DomainResult<()> {
        Err(VidSumError::Storage("store unavailable".into()))
    }

    async fn set_user(&self, _user: &UserRecord) -> DomainResult<()> {
        Err(VidSumError::Storage("store unavailable".into()))
    }

    async fn clear(&self) -> DomainResult<()> {
        Err(VidSumError::Storage("store unavailable".into()))
    }
}

/// Notifier that keeps every notice it receives.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<ForegroundNotice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<ForegroundNotice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn badges(&self) -> Vec<BadgeHint> {
        self.notices()
            .into_iter()
            .filter_map(|notice| match notice {
                ForegroundNotice::Badge { badge } => Some(badge),
                ForegroundNotice::Progress(_) => None,
            })
            .collect()
    }

    pub fn progress_count(&self) -> usize {
        self.notices()
            .iter()
            .filter(|notice| matches!(notice, ForegroundNotice::Progress(_)))
            .count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notice: ForegroundNotice) -> DomainResult<()> {
        self.notices.lock().unwrap().push(notice);
        Ok(())
    }
}

/// Notifier with no receiver attached.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _notice: ForegroundNotice) -> DomainResult<()> {
        Err(VidSumError::Internal("no foreground surface".into()))
    }
}

/// History that records completion events in arrival order.
#[derive(Default)]
pub struct MemoryHistory {
    events: Mutex<Vec<AnalysisCompleted>>,
}

impl MemoryHistory {
    pub fn events(&self) -> Vec<AnalysisCompleted> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl HistoryRecorder for MemoryHistory {
    async fn record(&self, event: &AnalysisCompleted) -> DomainResult<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn recent(&self) -> DomainResult<Vec<AnalysisRecord>> {
        Ok(self.events.lock().unwrap().iter().rev().map(AnalysisRecord::from).collect())
    }

    async fn clear(&self) -> DomainResult<()> {
        self.events.lock().unwrap().clear();
        Ok(())
    }
}

/// History whose every operation fails.
pub struct FailingHistory;

#[async_trait]
impl HistoryRecorder for FailingHistory {
    async fn record(&self, _event: &AnalysisCompleted) -> DomainResult<()> {
        Err(VidSumError::Storage("history unavailable".into()))
    }

    async fn recent(&self) -> DomainResult<Vec<AnalysisRecord>> {
        Err(VidSumError::Storage("history unavailable".into()))
    }

    async fn clear(&self) -> DomainResult<()> {
        Err(VidSumError::Storage("history unavailable".into()))
    }
}
