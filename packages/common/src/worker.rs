use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::judge_job::JudgeJob;

pub const JUDGE_TASK_TYPE: &str = "judge";

/// Envelope published to the task queue.
///
/// `id` is the submission id, which doubles as the dedup key so that a
/// redelivered or re-enqueued task is recognised as the same work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub task_type: String,
    pub payload: serde_json::Value,
    pub max_retries: u8,
    pub timeout_secs: u64,
    pub enqueued_at: DateTime<Utc>,
}

impl Task {
    /// Retry and timeout fields stay zero until the queue stamps them on enqueue.
    pub fn judge(job: &JudgeJob) -> serde_json::Result<Self> {
        Ok(Self {
            id: job.submission_id.to_string(),
            task_type: JUDGE_TASK_TYPE.to_string(),
            payload: serde_json::to_value(job)?,
            max_retries: 0,
            timeout_secs: 0,
            enqueued_at: Utc::now(),
        })
    }

    pub fn judge_job(&self) -> serde_json::Result<JudgeJob> {
        serde_json::from_value(self.payload.clone())
    }

    /// Submission id, if the envelope id is well formed.
    pub fn submission_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.id).ok()
    }
}
