//! Recent analyses

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::events::AnalysisCompleted;

/// Entry in the "recent analyses" list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub task_id: String,
    pub summary_id: String,
    pub video_url: String,
    pub completed_at: DateTime<Utc>,
}

impl From<&AnalysisCompleted> for AnalysisRecord {
    fn from(event: &AnalysisCompleted) -> Self {
        Self {
            task_id: event.task_id.clone(),
            summary_id: event.result.summary_id.clone(),
            video_url: event.video_url.clone(),
            completed_at: event.completed_at,
        }
    }
}
