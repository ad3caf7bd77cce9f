use chrono::{DateTime, Utc};
use common::{Limits, NewSubmission, ResultLine, Submission, SubmissionStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SubmissionConfig;
use crate::error::AppError;

/// Request body for creating a submission.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateSubmissionRequest {
    pub user_id: Uuid,
    pub problem_id: Uuid,
    pub contest_id: Option<Uuid>,
    /// Source code. Must be non-empty.
    #[schema(example = "print(int(input()) * 2)")]
    pub code: String,
    /// Language name (e.g., "cpp", "java", "python").
    #[schema(example = "python")]
    pub language: String,
    /// CPU time limit per test case in milliseconds.
    #[schema(example = 2000)]
    pub time_limit_ms: i32,
    /// Memory limit per test case in KB.
    #[schema(example = 262144)]
    pub memory_limit_kb: i32,
}

impl From<CreateSubmissionRequest> for NewSubmission {
    fn from(req: CreateSubmissionRequest) -> Self {
        Self {
            user_id: req.user_id,
            problem_id: req.problem_id,
            contest_id: req.contest_id,
            code: req.code,
            language: req.language,
            limits: Limits {
                time_limit_ms: req.time_limit_ms,
                memory_limit_kb: req.memory_limit_kb,
            },
        }
    }
}

/// Returned when a submission is accepted for judging.
#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionCreated {
    pub id: Uuid,
    pub status: SubmissionStatus,
}

impl From<&Submission> for SubmissionCreated {
    fn from(s: &Submission) -> Self {
        Self {
            id: s.id,
            status: s.status,
        }
    }
}

/// Full submission details.
#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub problem_id: Uuid,
    pub contest_id: Option<Uuid>,
    pub language: String,
    pub limits: Limits,
    pub status: SubmissionStatus,
    pub score: i32,
    pub test_cases_passed: i32,
    pub total_test_cases: i32,
    pub max_time_ms: i32,
    pub max_memory_kb: i32,
    /// One line per completed test case, ordered by test position.
    pub results: Vec<ResultLine>,
    pub failed_test_case: Option<Uuid>,
    pub compile_output: Option<String>,
    /// Set when the submission ended in `SystemError`.
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub queued_at: Option<DateTime<Utc>>,
    pub judge_completed_at: Option<DateTime<Utc>>,
}

impl From<Submission> for SubmissionResponse {
    fn from(s: Submission) -> Self {
        Self {
            id: s.id,
            user_id: s.user_id,
            problem_id: s.problem_id,
            contest_id: s.contest_id,
            language: s.language,
            limits: s.limits,
            status: s.status,
            score: s.score,
            test_cases_passed: s.test_cases_passed,
            total_test_cases: s.total_test_cases,
            max_time_ms: s.max_time_ms,
            max_memory_kb: s.max_memory_kb,
            results: s.results,
            failed_test_case: s.failed_test_case,
            compile_output: s.compile_output,
            error_code: s.error_code,
            error_message: s.error_message,
            submitted_at: s.submitted_at,
            queued_at: s.queued_at,
            judge_completed_at: s.judge_completed_at,
        }
    }
}

/// Checks that do not need the store. Language support is checked separately.
pub fn validate_new_submission(
    input: &NewSubmission,
    bounds: &SubmissionConfig,
) -> Result<(), AppError> {
    if input.code.trim().is_empty() {
        return Err(AppError::Validation("Code must not be empty".into()));
    }
    if input.code.len() > bounds.max_code_bytes {
        return Err(AppError::Validation(format!(
            "Code must be at most {} bytes",
            bounds.max_code_bytes
        )));
    }
    if !input.limits.is_valid() {
        return Err(AppError::Validation(
            "Time and memory limits must be positive".into(),
        ));
    }
    if input.limits.time_limit_ms > bounds.max_time_limit_ms {
        return Err(AppError::Validation(format!(
            "Time limit must be at most {} ms",
            bounds.max_time_limit_ms
        )));
    }
    if input.limits.memory_limit_kb > bounds.max_memory_limit_kb {
        return Err(AppError::Validation(format!(
            "Memory limit must be at most {} KB",
            bounds.max_memory_limit_kb
        )));
    }
    Ok(())
}
