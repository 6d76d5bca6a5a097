//! Events flowing from the background process to its collaborators

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::job::JobResult;
use crate::impl_wire_name_conversions;

/// Progress relayed to the foreground surface while a job is polled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub task_id: String,
    pub progress: f64,
    pub message: String,
}

/// Toolbar badge hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeHint {
    Working,
    Done,
    Error,
    Clear,
}

impl_wire_name_conversions!(BadgeHint {
    Working => "working",
    Done => "done",
    Error => "error",
    Clear => "clear",
});

/// One-way notification to the foreground surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ForegroundNotice {
    Progress(ProgressEvent),
    Badge { badge: BadgeHint },
}

/// Emitted once a job polled to completion produced a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisCompleted {
    pub task_id: String,
    pub video_url: String,
    pub result: JobResult,
    pub completed_at: DateTime<Utc>,
}
