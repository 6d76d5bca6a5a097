//! Recent analyses kept in process memory

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;
use vidsum_core::HistoryRecorder;
use vidsum_domain::{AnalysisCompleted, AnalysisRecord, HistoryConfig, Result};

/// Bounded, newest-first list of completed analyses
///
/// Re-recording a summary moves it to the front instead of duplicating it.
#[derive(Debug)]
pub struct InMemoryHistory {
    capacity: usize,
    records: Mutex<VecDeque<AnalysisRecord>>,
}

impl InMemoryHistory {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), records: Mutex::new(VecDeque::new()) }
    }

    pub fn from_config(config: &HistoryConfig) -> Self {
        Self::new(config.capacity)
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

#[async_trait]
impl HistoryRecorder for InMemoryHistory {
    async fn record(&self, event: &AnalysisCompleted) -> Result<()> {
        let record = AnalysisRecord::from(event);
        let mut records = self.records.lock();

        records.retain(|existing| existing.summary_id != record.summary_id);
        records.push_front(record);
        records.truncate(self.capacity);

        debug!(task_id = %event.task_id, size = records.len(), "Recorded completed analysis");
        Ok(())
    }

    async fn recent(&self) -> Result<Vec<AnalysisRecord>> {
        Ok(self.records.lock().iter().cloned().collect())
    }

    async fn clear(&self) -> Result<()> {
        self.records.lock().clear();
        Ok(())
    }
}
