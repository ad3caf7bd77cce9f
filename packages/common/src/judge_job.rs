use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::test_case::TestCase;

/// Resource limits applied to every test case of a submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Limits {
    /// CPU time limit in milliseconds.
    pub time_limit_ms: i32,
    /// Memory limit in kilobytes.
    pub memory_limit_kb: i32,
}

impl Limits {
    pub fn is_valid(&self) -> bool {
        self.time_limit_ms > 0 && self.memory_limit_kb > 0
    }

    /// CPU limit in the fractional seconds execution backends expect.
    pub fn time_limit_secs(&self) -> f64 {
        f64::from(self.time_limit_ms) / 1000.0
    }
}

/// Everything a worker needs to dispatch a submission. Travels as the queue payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JudgeJob {
    pub submission_id: Uuid,
    pub problem_id: Uuid,
    pub code: String,
    pub language: String,
    pub limits: Limits,
    /// Snapshot of the problem's test cases at submission time.
    pub test_cases: Vec<TestCase>,
    /// Start of the judging budget.
    pub queued_at: DateTime<Utc>,
}
