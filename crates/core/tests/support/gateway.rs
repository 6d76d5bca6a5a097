//! API gateway mocks

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use vidsum_core::{ApiGateway, CredentialStore, JobStatusSource};
use vidsum_domain::{
    AnalysisRequest, Credentials, Job, JobResult, JobStatus, Registration,
    Result as DomainResult, StartedJob, TokenGrant, UserRecord, VidSumError,
};

pub const TASK_ID: &str = "task-1";

pub fn user(id: &str) -> UserRecord {
    let mut fields = Map::new();
    fields.insert("id".into(), json!(id));
    fields.insert("email".into(), json!(format!("{id}@example.com")));
    UserRecord(fields)
}

pub fn job(status: JobStatus, progress: f64) -> Job {
    Job {
        task_id: TASK_ID.to_string(),
        status,
        progress,
        message: format!("{status} at {progress}"),
        result: None,
        error: None,
    }
}

pub fn completed_job(summary_id: &str) -> Job {
    Job {
        result: Some(JobResult { summary_id: summary_id.to_string(), extra: Map::new() }),
        ..job(JobStatus::Completed, 100.0)
    }
}

/// Gateway answering from canned values; job statuses replay a script and
/// the last entry repeats.
pub struct MockGateway {
    pub grant: TokenGrant,
    pub current_user: UserRecord,
    pub refresh_result: bool,
    jobs: Mutex<VecDeque<Job>>,
    last_job: Mutex<Option<Job>>,
    pub fetches: AtomicUsize,
    pub started: Mutex<Vec<AnalysisRequest>>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self {
            grant: TokenGrant {
                access_token: "access-1".into(),
                refresh_token: "refresh-1".into(),
                user: Some(user("u-1")),
            },
            current_user: user("u-1"),
            refresh_result: true,
            jobs: Mutex::new(VecDeque::new()),
            last_job: Mutex::new(None),
            fetches: AtomicUsize::new(0),
            started: Mutex::new(Vec::new()),
        }
    }
}

impl MockGateway {
    pub fn with_jobs(jobs: Vec<Job>) -> Self {
        Self { jobs: Mutex::new(jobs.into()), ..Self::default() }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobStatusSource for MockGateway {
    async fn fetch_job(&self, _task_id: &str) -> DomainResult<Job> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last_job.lock().unwrap();
        if let Some(next) = self.jobs.lock().unwrap().pop_front() {
            *last = Some(next);
        }
        last.clone().ok_or(VidSumError::api_with_detail(404, "Task not found"))
    }
}

#[async_trait]
impl ApiGateway for MockGateway {
    async fn login(&self, _credentials: &Credentials) -> DomainResult<TokenGrant> {
        Ok(self.grant.clone())
    }

    async fn register(&self, _registration: &Registration) -> DomainResult<TokenGrant> {
        Ok(self.grant.clone())
    }

    async fn refresh_session(&self) -> DomainResult<bool> {
        Ok(self.refresh_result)
    }

    async fn current_user(&self) -> DomainResult<UserRecord> {
        Ok(self.current_user.clone())
    }

    async fn start_analysis(&self, request: &AnalysisRequest) -> DomainResult<StartedJob> {
        self.started.lock().unwrap().push(request.clone());
        Ok(StartedJob { task_id: TASK_ID.to_string() })
    }

    async fn summary(&self, summary_id: &str) -> DomainResult<Value> {
        Ok(json!({"id": summary_id, "title": "A video"}))
    }

    async fn usage(&self) -> DomainResult<Value> {
        Ok(json!({"used": 3, "limit": 10}))
    }
}

/// Gateway whose every call fails with the same error.
pub struct FailingGateway(pub VidSumError);

#[async_trait]
impl JobStatusSource for FailingGateway {
    async fn fetch_job(&self, _task_id: &str) -> DomainResult<Job> {
        Err(self.0.clone())
    }
}

#[async_trait]
impl ApiGateway for FailingGateway {
    async fn login(&self, _credentials: &Credentials) -> DomainResult<TokenGrant> {
        Err(self.0.clone())
    }

    async fn register(&self, _registration: &Registration) -> DomainResult<TokenGrant> {
        Err(self.0.clone())
    }

    async fn refresh_session(&self) -> DomainResult<bool> {
        Err(self.0.clone())
    }

    async fn current_user(&self) -> DomainResult<UserRecord> {
        Err(self.0.clone())
    }

    async fn start_analysis(&self, _request: &AnalysisRequest) -> DomainResult<StartedJob> {
        Err(self.0.clone())
    }

    async fn summary(&self, _summary_id: &str) -> DomainResult<Value> {
        Err(self.0.clone())
    }

    async fn usage(&self) -> DomainResult<Value> {
        Err(self.0.clone())
    }
}

/// Gateway that panics on every call.
pub struct PanickingGateway;

#[async_trait]
impl JobStatusSource for PanickingGateway {
    async fn fetch_job(&self, _task_id: &str) -> DomainResult<Job> {
        panic!("status endpoint exploded")
    }
}

#[async_trait]
impl ApiGateway for PanickingGateway {
    async fn login(&self, _credentials: &Credentials) -> DomainResult<TokenGrant> {
        panic!("login exploded")
    }

    async fn register(&self, _registration: &Registration) -> DomainResult<TokenGrant> {
        panic!("register exploded")
    }

    async fn refresh_session(&self) -> DomainResult<bool> {
        panic!("refresh exploded")
    }

    async fn current_user(&self) -> DomainResult<UserRecord> {
        panic!("current user exploded")
    }

    async fn start_analysis(&self, _request: &AnalysisRequest) -> DomainResult<StartedJob> {
        panic!("start exploded")
    }

    async fn summary(&self, _summary_id: &str) -> DomainResult<Value> {
        panic!("summary exploded")
    }

    async fn usage(&self) -> DomainResult<Value> {
        panic!("usage exploded")
    }
}

/// Gateway that clears `credentials` while the current user is being
/// fetched, as a logout racing the request would.
pub struct SigningOutGateway<C> {
    pub inner: MockGateway,
    pub credentials: std::sync::Arc<C>,
}

#[async_trait]
impl<C: CredentialStore + 'static> JobStatusSource for SigningOutGateway<C> {
    async fn fetch_job(&self, task_id: &str) -> DomainResult<Job> {
        self.inner.fetch_job(task_id).await
    }
}

#[async_trait]
impl<C: CredentialStore + 'static> ApiGateway for SigningOutGateway<C> {
    async fn login(&self, credentials: &Credentials) -> DomainResult<TokenGrant> {
        self.inner.login(credentials).await
    }

    async fn register(&self, registration: &Registration) -> DomainResult<TokenGrant> {
        self.inner.register(registration).await
    }

    async fn refresh_session(&self) -> DomainResult<bool> {
        self.inner.refresh_session().await
    }

    async fn current_user(&self) -> DomainResult<UserRecord> {
        self.credentials.clear().await?;
        self.inner.current_user().await
    }

    async fn start_analysis(&self, request: &AnalysisRequest) -> DomainResult<StartedJob> {
        self.inner.start_analysis(request).await
    }

    async fn summary(&self, summary_id: &str) -> DomainResult<Value> {
        self.inner.summary(summary_id).await
    }

    async fn usage(&self) -> DomainResult<Value> {
        self.inner.usage().await
    }
}
