use std::sync::Arc;

use common::{NewSubmission, Submission, error_code};
use store::{JudgeStore, SubmissionRepository};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::AppError;
use crate::services::submission::SubmissionService;

/// Operator actions, built on top of the submission service.
pub struct AdminService {
    submissions: Arc<SubmissionService>,
    store: Arc<dyn JudgeStore>,
}

impl AdminService {
    pub fn new(submissions: Arc<SubmissionService>, store: Arc<dyn JudgeStore>) -> Self {
        Self { submissions, store }
    }

    /// Judge the same code again as a new submission. The original is untouched.
    #[instrument(skip(self))]
    pub async fn rejudge(&self, id: Uuid) -> Result<Submission, AppError> {
        let original = self.submissions.get(id).await?;
        let fresh = self
            .submissions
            .create(NewSubmission {
                user_id: original.user_id,
                problem_id: original.problem_id,
                contest_id: original.contest_id,
                code: original.code,
                language: original.language,
                limits: original.limits,
            })
            .await?;
        info!(rejudged_as = %fresh.id, "Submission rejudged");
        Ok(fresh)
    }

    /// Stop judging a submission that has no verdict yet.
    #[instrument(skip(self))]
    pub async fn abort(&self, id: Uuid) -> Result<Submission, AppError> {
        let current = self.submissions.get(id).await?;
        if current.status.is_final() {
            return Err(AppError::Conflict(format!(
                "Submission already finished with {}",
                current.status
            )));
        }
        let aborted = self
            .store
            .fail_submission(id, error_code::ABORTED, "aborted by administrator")
            .await?;
        if !aborted {
            return Err(AppError::Conflict(
                "Submission reached a verdict before it could be aborted".into(),
            ));
        }
        info!("Submission aborted");
        self.submissions.get(id).await
    }
}
