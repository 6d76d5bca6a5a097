//! RPC surface exposed to foreground surfaces
//!
//! Foreground code talks to the background process exclusively through
//! `{ action, data }` envelopes. The dispatcher maps each action to a
//! handler and guarantees exactly one response per envelope, whatever the
//! handler does.

mod dispatcher;
mod handlers;

use tokio::sync::oneshot;
use vidsum_domain::{RpcRequest, RpcResponse};

pub use dispatcher::{DispatcherDeps, RpcDispatcher};

/// Envelope delivered by the runtime message channel, paired with the slot
/// its response must be written to.
#[derive(Debug)]
pub struct Inbound {
    pub request: RpcRequest,
    pub reply: oneshot::Sender<RpcResponse>,
}

impl Inbound {
    /// Build an envelope and the receiver its response will arrive on.
    #[must_use]
    pub fn new(request: RpcRequest) -> (Self, oneshot::Receiver<RpcResponse>) {
        let (reply, receiver) = oneshot::channel();
        (Self { request, reply }, receiver)
    }
}
