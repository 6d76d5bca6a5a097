use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use vidsum_domain::{Action, RpcRequest, RpcResponse, VidSumError};

use super::Inbound;
use crate::analysis::poller::{JobPoller, PollerConfig};
use crate::analysis::ports::{ApiGateway, HistoryRecorder, Notifier};
use crate::session::ports::CredentialStore;

/// Collaborators the handlers act on
pub struct DispatcherDeps {
    pub api: Arc<dyn ApiGateway>,
    pub credentials: Arc<dyn CredentialStore>,
    pub notifier: Arc<dyn Notifier>,
    pub history: Arc<dyn HistoryRecorder>,
    pub poller: PollerConfig,
}

pub(super) struct DispatcherInner {
    pub(super) api: Arc<dyn ApiGateway>,
    pub(super) credentials: Arc<dyn CredentialStore>,
    pub(super) notifier: Arc<dyn Notifier>,
    pub(super) history: Arc<dyn HistoryRecorder>,
    pub(super) poller: JobPoller<dyn ApiGateway>,
    /// Cancellation tokens of analyses currently being polled, by task id.
    pub(super) active_polls: DashMap<String, CancellationToken>,
}

/// Routes RPC envelopes to action handlers
///
/// Cheap to clone; clones share the same collaborators and the same
/// registry of active polls.
#[derive(Clone)]
pub struct RpcDispatcher {
    pub(super) inner: Arc<DispatcherInner>,
}

impl RpcDispatcher {
    #[must_use]
    pub fn new(deps: DispatcherDeps) -> Self {
        let poller = JobPoller::new(Arc::clone(&deps.api), deps.poller);
        Self {
            inner: Arc::new(DispatcherInner {
                api: deps.api,
                credentials: deps.credentials,
                notifier: deps.notifier,
                history: deps.history,
                poller,
                active_polls: DashMap::new(),
            }),
        }
    }

    /// Answer one envelope.
    ///
    /// Never fails: handler errors and panics are converted into
    /// `{ success: false, error }`, and unknown actions are answered
    /// without invoking any handler.
    #[instrument(skip(self, request), fields(action = %request.action))]
    pub async fn dispatch(&self, request: RpcRequest) -> RpcResponse {
        let action = match request.parsed_action() {
            Ok(action) => action,
            Err(err) => {
                warn!(error_code = err.code(), "Rejecting unknown action");
                return RpcResponse::from(&err);
            }
        };

        let start = Instant::now();
        let outcome = AssertUnwindSafe(self.route(action, &request)).catch_unwind().await;

        let (response, error_code) = match outcome {
            Ok(Ok(response)) => (response, None),
            Ok(Err(err)) => (RpcResponse::from(&err), Some(err.code())),
            Err(panic) => {
                let err = VidSumError::Internal(panic_message(panic.as_ref()));
                (RpcResponse::from(&err), Some(err.code()))
            }
        };

        log_action_outcome(action, start, &response, error_code);
        response
    }

    /// Answer one envelope on a spawned task and deliver the response
    /// through `reply`.
    ///
    /// The handler runs to completion even if the requester has already
    /// dropped its receiver.
    pub fn dispatch_detached(
        &self,
        request: RpcRequest,
        reply: tokio::sync::oneshot::Sender<RpcResponse>,
    ) -> JoinHandle<()> {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            let action = request.action.clone();
            let response = dispatcher.dispatch(request).await;
            if reply.send(response).is_err() {
                debug!(action = %action, "Requester went away before the response was ready");
            }
        })
    }

    /// Serve envelopes from the runtime message channel until it closes or
    /// `shutdown` fires. Every envelope is dispatched concurrently.
    pub async fn serve(&self, mut inbox: mpsc::Receiver<Inbound>, shutdown: CancellationToken) {
        info!("RPC dispatcher serving");

        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    debug!("RPC dispatcher shutting down");
                    break;
                }
                next = inbox.recv() => match next {
                    Some(Inbound { request, reply }) => {
                        self.dispatch_detached(request, reply);
                    }
                    None => {
                        debug!("RPC inbox closed");
                        break;
                    }
                },
            }
        }

        self.cancel_all_polls();
        info!("RPC dispatcher stopped");
    }

    /// Task ids of analyses currently being polled.
    #[must_use]
    pub fn active_analyses(&self) -> Vec<String> {
        self.inner.active_polls.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Cancel one active poll; `false` when none was running for `task_id`.
    pub fn cancel_poll(&self, task_id: &str) -> bool {
        match self.inner.active_polls.remove(task_id) {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all_polls(&self) {
        let task_ids = self.active_analyses();
        for task_id in task_ids {
            self.cancel_poll(&task_id);
        }
    }
}

fn log_action_outcome(
    action: Action,
    start: Instant,
    response: &RpcResponse,
    error_code: Option<&'static str>,
) {
    let duration_ms = start.elapsed().as_millis() as u64;
    let action = action.as_str();

    if response.success {
        info!(action, duration_ms, "action_success");
    } else {
        warn!(action, duration_ms, error_code = error_code.unwrap_or("BUSINESS"), "action_failure");
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("handler panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("handler panicked: {message}")
    } else {
        "handler panicked".to_string()
    }
}
