//! Integration tests for the RPC dispatcher
//!
//! Drive the dispatcher through its public surface with in-memory
//! collaborators and assert on the single response each envelope gets.

mod support;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use support::gateway::{completed_job, job, TASK_ID};
use support::{
    deps, FailingCredentials, FailingGateway, FailingHistory, FailingNotifier, MemoryCredentials,
    MemoryHistory, MockGateway, PanickingGateway, RecordingNotifier, SigningOutGateway,
};
use tokio_util::sync::CancellationToken;
use vidsum_core::{Inbound, RpcDispatcher};
use vidsum_domain::{Action, BadgeHint, JobStatus, RpcRequest, Session, VidSumError};

struct Harness {
    dispatcher: RpcDispatcher,
    api: Arc<MockGateway>,
    credentials: Arc<MemoryCredentials>,
    notifier: Arc<RecordingNotifier>,
    history: Arc<MemoryHistory>,
}

fn harness(api: MockGateway) -> Harness {
    harness_with_session(api, Session::default())
}

fn harness_with_session(api: MockGateway, session: Session) -> Harness {
    let api = Arc::new(api);
    let credentials = Arc::new(MemoryCredentials::with_session(session));
    let notifier = Arc::new(RecordingNotifier::default());
    let history = Arc::new(MemoryHistory::default());
    let dispatcher = RpcDispatcher::new(deps(
        api.clone(),
        credentials.clone(),
        notifier.clone(),
        history.clone(),
    ));
    Harness { dispatcher, api, credentials, notifier, history }
}

fn analyze(url: &str) -> RpcRequest {
    RpcRequest::new("analyzeVideo").with("videoUrl", url)
}

const VIDEO_URL: &str = "https://www.youtube.com/watch?v=abc";

#[tokio::test]
async fn test_every_action_with_failing_collaborators_answers_once_with_failure() {
    let dispatcher = RpcDispatcher::new(deps(
        Arc::new(FailingGateway(VidSumError::Network("offline".into()))),
        Arc::new(FailingCredentials),
        Arc::new(FailingNotifier),
        Arc::new(FailingHistory),
    ));

    for action in Action::ALL {
        let response = dispatcher.dispatch(RpcRequest::new(action.as_str())).await;
        assert!(!response.success, "{action} should fail");
        assert!(response.error.as_deref().is_some_and(|e| !e.is_empty()), "{action} error text");
    }
}

#[tokio::test]
async fn test_panicking_handler_is_converted_into_failure() {
    let dispatcher = RpcDispatcher::new(deps(
        Arc::new(PanickingGateway),
        Arc::new(MemoryCredentials::default()),
        Arc::new(RecordingNotifier::default()),
        Arc::new(MemoryHistory::default()),
    ));

    let response = dispatcher.dispatch(RpcRequest::new("getUsage")).await;

    assert!(!response.success);
    assert!(response.error.unwrap().contains("usage exploded"));
}

#[tokio::test]
async fn test_unknown_action_is_rejected_without_side_effects() {
    let h = harness(MockGateway::default());

    let response = h.dispatcher.dispatch(RpcRequest::new("deleteEverything")).await;

    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("Unknown action"));
    assert_eq!(h.api.fetch_count(), 0);
    assert!(h.notifier.notices().is_empty());
}

#[tokio::test]
async fn test_login_stores_tokens_and_user() {
    let h = harness(MockGateway::default());

    let response = h
        .dispatcher
        .dispatch(RpcRequest::new("login").with("email", "a@b.c").with("password", "pw"))
        .await;

    assert!(response.success);
    assert_eq!(response.get("user").unwrap()["id"], json!("u-1"));
    let session = h.credentials.snapshot();
    assert_eq!(session.access_token.as_deref(), Some("access-1"));
    assert_eq!(session.refresh_token.as_deref(), Some("refresh-1"));
    assert!(session.user.is_some());
}

#[tokio::test]
async fn test_register_without_user_in_grant_fetches_current_user() {
    let mut api = MockGateway::default();
    api.grant.user = None;
    api.current_user = support::gateway::user("u-9");
    let h = harness(api);

    let response = h
        .dispatcher
        .dispatch(
            RpcRequest::new("register")
                .with("email", "new@b.c")
                .with("password", "pw")
                .with("name", "New"),
        )
        .await;

    assert!(response.success);
    assert_eq!(h.credentials.snapshot().user.unwrap().id(), Some("u-9"));
}

#[tokio::test]
async fn test_login_requires_credentials() {
    let h = harness(MockGateway::default());

    let response = h.dispatcher.dispatch(RpcRequest::new("login").with("email", "a@b.c")).await;

    assert!(!response.success);
    assert!(response.error.unwrap().contains("'password' is required"));
    assert!(h.credentials.snapshot().is_empty());
}

#[tokio::test]
async fn test_get_session_and_logout() {
    let session = Session::new("a".into(), "r".into(), Some(support::gateway::user("u-1")));
    let h = harness_with_session(MockGateway::default(), session);

    let response = h.dispatcher.dispatch(RpcRequest::new("getSession")).await;
    assert_eq!(response.get("authenticated"), Some(&json!(true)));
    assert_eq!(response.get("user").unwrap()["id"], json!("u-1"));

    let response = h.dispatcher.dispatch(RpcRequest::new("logout")).await;
    assert!(response.success);
    assert!(h.credentials.snapshot().is_empty());
    assert_eq!(h.notifier.badges(), vec![BadgeHint::Clear]);

    let response = h.dispatcher.dispatch(RpcRequest::new("getSession")).await;
    assert_eq!(response.get("authenticated"), Some(&json!(false)));
    assert_eq!(response.get("user"), Some(&json!(null)));
}

#[tokio::test]
async fn test_refresh_session_reports_outcome() {
    let mut api = MockGateway::default();
    api.refresh_result = false;
    let session = Session::new("a".into(), "r".into(), None);
    let h = harness_with_session(api, session.clone());

    let response = h.dispatcher.dispatch(RpcRequest::new("refreshSession")).await;

    assert!(response.success);
    assert_eq!(response.get("refreshed"), Some(&json!(false)));
    assert_eq!(h.credentials.snapshot(), session);
}

#[tokio::test]
async fn test_current_user_does_not_repopulate_cleared_session() {
    let session = Session::new("a".into(), "r".into(), None);
    let credentials = Arc::new(MemoryCredentials::with_session(session));
    let api = SigningOutGateway { inner: MockGateway::default(), credentials: credentials.clone() };
    let dispatcher = RpcDispatcher::new(deps(
        Arc::new(api),
        credentials.clone(),
        Arc::new(RecordingNotifier::default()),
        Arc::new(MemoryHistory::default()),
    ));

    let response = dispatcher.dispatch(RpcRequest::new("getCurrentUser")).await;

    assert!(response.success);
    let stored = credentials.snapshot();
    assert!(stored.is_empty(), "signed-out store gained {stored:?}");
}

#[tokio::test]
async fn test_session_expiry_surfaces_message() {
    let dispatcher = RpcDispatcher::new(deps(
        Arc::new(FailingGateway(VidSumError::SessionExpired)),
        Arc::new(MemoryCredentials::default()),
        Arc::new(RecordingNotifier::default()),
        Arc::new(MemoryHistory::default()),
    ));

    let response = dispatcher.dispatch(RpcRequest::new("getCurrentUser")).await;

    assert_eq!(response.error.as_deref(), Some("Session expired. Please log in again."));
}

#[tokio::test]
async fn test_start_analysis_validates_url() {
    let h = harness(MockGateway::default());

    let response =
        h.dispatcher.dispatch(RpcRequest::new("startAnalysis").with("videoUrl", "not a url")).await;
    assert!(!response.success);

    let response = h
        .dispatcher
        .dispatch(RpcRequest::new("startAnalysis").with("videoUrl", "ftp://host/video"))
        .await;
    assert!(!response.success);

    let response = h
        .dispatcher
        .dispatch(
            RpcRequest::new("startAnalysis").with("videoUrl", VIDEO_URL).with("language", "de"),
        )
        .await;
    assert!(response.success);
    assert_eq!(response.get("taskId"), Some(&json!(TASK_ID)));

    let started = h.api.started.lock().unwrap().clone();
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].language.as_deref(), Some("de"));
}

#[tokio::test]
async fn test_get_task_status_returns_job() {
    let h = harness(MockGateway::with_jobs(vec![job(JobStatus::Processing, 40.0)]));

    let response =
        h.dispatcher.dispatch(RpcRequest::new("getTaskStatus").with("taskId", TASK_ID)).await;

    assert!(response.success);
    assert_eq!(response.get("job").unwrap()["status"], json!("processing"));
    assert_eq!(response.get("job").unwrap()["progress"], json!(40.0));
}

#[tokio::test(start_paused = true)]
async fn test_analyze_video_completes_and_records_history() {
    let h = harness(MockGateway::with_jobs(vec![
        job(JobStatus::Queued, 0.0),
        job(JobStatus::Processing, 50.0),
        completed_job("s-1"),
    ]));

    let response = h.dispatcher.dispatch(analyze(VIDEO_URL)).await;

    assert!(response.success, "{:?}", response.error);
    assert_eq!(response.get("taskId"), Some(&json!(TASK_ID)));
    assert_eq!(response.get("result").unwrap()["summary_id"], json!("s-1"));

    let events = h.history.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].task_id, TASK_ID);
    assert_eq!(events[0].video_url, VIDEO_URL);
    assert_eq!(events[0].result.summary_id, "s-1");

    assert_eq!(h.notifier.progress_count(), 2);
    assert_eq!(h.notifier.badges(), vec![BadgeHint::Working, BadgeHint::Done]);
    assert!(h.dispatcher.active_analyses().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_analysis_does_not_record_history() {
    let mut failed = job(JobStatus::Failed, 30.0);
    failed.error = Some("Video unavailable".into());
    let h = harness(MockGateway::with_jobs(vec![job(JobStatus::Processing, 10.0), failed]));

    let response = h.dispatcher.dispatch(analyze(VIDEO_URL)).await;

    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("Video unavailable"));
    assert_eq!(response.get("taskId"), Some(&json!(TASK_ID)));
    assert!(h.history.events().is_empty());
    assert_eq!(h.notifier.badges(), vec![BadgeHint::Working, BadgeHint::Error]);
}

#[tokio::test(start_paused = true)]
async fn test_analysis_timeout_message() {
    let h = harness(MockGateway::with_jobs(vec![job(JobStatus::Processing, 10.0)]));

    let response = h.dispatcher.dispatch(analyze(VIDEO_URL)).await;

    assert_eq!(
        response.error.as_deref(),
        Some("Analysis timed out. The video may be too long to process.")
    );
    assert!(h.history.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_history_failure_does_not_fail_analysis() {
    let dispatcher = RpcDispatcher::new(deps(
        Arc::new(MockGateway::with_jobs(vec![completed_job("s-2")])),
        Arc::new(MemoryCredentials::default()),
        Arc::new(RecordingNotifier::default()),
        Arc::new(FailingHistory),
    ));

    let response = dispatcher.dispatch(analyze(VIDEO_URL)).await;

    assert!(response.success);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_analysis_stops_active_poll() {
    let h = harness(MockGateway::with_jobs(vec![job(JobStatus::Processing, 10.0)]));
    let (inbound, receiver) = Inbound::new(analyze(VIDEO_URL));
    h.dispatcher.dispatch_detached(inbound.request, inbound.reply);

    while h.dispatcher.active_analyses().is_empty() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    tokio::time::sleep(Duration::from_secs(10)).await;

    let response =
        h.dispatcher.dispatch(RpcRequest::new("cancelAnalysis").with("taskId", TASK_ID)).await;
    assert_eq!(response.get("cancelled"), Some(&json!(true)));

    let analysis = receiver.await.unwrap();
    assert!(!analysis.success);
    assert_eq!(analysis.error.as_deref(), Some("Analysis cancelled"));
    assert!(h.dispatcher.active_analyses().is_empty());
    assert_eq!(h.notifier.badges(), vec![BadgeHint::Working, BadgeHint::Clear]);

    let fetches = h.api.fetch_count();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(h.api.fetch_count(), fetches);

    let response =
        h.dispatcher.dispatch(RpcRequest::new("cancelAnalysis").with("taskId", TASK_ID)).await;
    assert_eq!(response.get("cancelled"), Some(&json!(false)));
}

#[tokio::test]
async fn test_history_listing_and_clear() {
    let h = harness(MockGateway::with_jobs(vec![completed_job("s-1")]));
    h.dispatcher.dispatch(analyze(VIDEO_URL)).await;

    let response = h.dispatcher.dispatch(RpcRequest::new("getHistory")).await;
    let analyses = response.get("analyses").unwrap().as_array().unwrap().clone();
    assert_eq!(analyses.len(), 1);
    assert_eq!(analyses[0]["summaryId"], json!("s-1"));

    let response = h.dispatcher.dispatch(RpcRequest::new("clearHistory")).await;
    assert!(response.success);
    assert!(h.history.events().is_empty());
}

#[tokio::test]
async fn test_summary_and_usage_pass_through() {
    let h = harness(MockGateway::default());

    let response =
        h.dispatcher.dispatch(RpcRequest::new("getSummary").with("summaryId", "s-7")).await;
    assert_eq!(response.get("summary").unwrap()["id"], json!("s-7"));

    let response = h.dispatcher.dispatch(RpcRequest::new("getUsage")).await;
    assert_eq!(response.get("usage"), Some(&json!({"used": 3, "limit": 10})));
}

#[tokio::test]
async fn test_detached_dispatch_completes_after_receiver_dropped() {
    let h = harness(MockGateway::default());
    let (inbound, receiver) = Inbound::new(
        RpcRequest::new("login").with("email", "a@b.c").with("password", "pw"),
    );
    drop(receiver);

    h.dispatcher.dispatch_detached(inbound.request, inbound.reply).await.unwrap();

    assert!(h.credentials.snapshot().is_authenticated());
}

#[tokio::test]
async fn test_serve_answers_inbox_until_shutdown() {
    let h = harness(MockGateway::default());
    let (sender, inbox) = tokio::sync::mpsc::channel(8);
    let shutdown = CancellationToken::new();

    let server = {
        let dispatcher = h.dispatcher.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { dispatcher.serve(inbox, shutdown).await })
    };

    let (inbound, usage) = Inbound::new(RpcRequest::new("getUsage"));
    sender.send(inbound).await.unwrap();
    let (inbound, unknown) = Inbound::new(RpcRequest::new("nope"));
    sender.send(inbound).await.unwrap();

    assert!(usage.await.unwrap().success);
    assert_eq!(unknown.await.unwrap().error.as_deref(), Some("Unknown action"));

    shutdown.cancel();
    server.await.unwrap();
}
