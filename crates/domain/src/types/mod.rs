//! Domain types and models

pub mod events;
pub mod history;
pub mod job;
pub mod rpc;
pub mod session;

pub use events::{AnalysisCompleted, BadgeHint, ForegroundNotice, ProgressEvent};
pub use history::AnalysisRecord;
pub use job::{AnalysisRequest, Job, JobResult, JobStatus, StartedJob};
pub use rpc::{Action, RpcRequest, RpcResponse};
pub use session::{Credentials, Registration, Session, TokenGrant, UserRecord};
