use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    #[default]
    Pending,
    Finished,
}

/// One launched worker, as reported by [`ProcessSupervisor::info`](crate::supervisor::ProcessSupervisor::info).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerRecord {
    pub target: String,
    pub payload: Value,
    /// OS pid; `None` when the spawn did not produce one.
    pub identity: Option<u32>,
    #[serde(default)]
    pub status: WorkerStatus,
    pub launched_at: DateTime<Utc>,
    /// When a poll first saw the worker gone, not its actual exit time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl WorkerRecord {
    pub fn new(
        target: String,
        payload: Value,
        identity: Option<u32>,
        launched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            target,
            payload,
            identity,
            status: WorkerStatus::Pending,
            launched_at,
            finished_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == WorkerStatus::Pending
    }

    pub fn mark_finished(mut self, finished_at: DateTime<Utc>) -> Self {
        self.status = WorkerStatus::Finished;
        self.finished_at = Some(finished_at);
        self
    }
}
