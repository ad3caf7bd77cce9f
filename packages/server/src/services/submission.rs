use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::config::MqAppConfig;
use common::worker::Task;
use common::{JudgeJob, NewSubmission, Submission, TestCase, error_code};
use exec_client::language_id;
use mq::{EnqueueOptions, EnqueueOutcome, TaskQueue};
use store::{JudgeStore, SubmissionRepository, TestCaseRepository};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::config::SubmissionConfig;
use crate::error::AppError;
use crate::models::submission::validate_new_submission;

/// Accepts submissions and hands them to the task queue.
pub struct SubmissionService {
    store: Arc<dyn JudgeStore>,
    queue: Arc<dyn TaskQueue>,
    bounds: SubmissionConfig,
    delivery: MqAppConfig,
}

impl SubmissionService {
    pub fn new(
        store: Arc<dyn JudgeStore>,
        queue: Arc<dyn TaskQueue>,
        bounds: SubmissionConfig,
        delivery: MqAppConfig,
    ) -> Self {
        Self {
            store,
            queue,
            bounds,
            delivery,
        }
    }

    /// Validate, persist as `Pending`, enqueue, then mark `Queued`.
    ///
    /// Once the row exists every later failure is recorded on it instead of
    /// leaving an orphan.
    #[instrument(skip_all, fields(problem_id = %input.problem_id, language = %input.language))]
    pub async fn create(&self, input: NewSubmission) -> Result<Submission, AppError> {
        validate_new_submission(&input, &self.bounds)?;
        language_id(&input.language)
            .map_err(|_| AppError::UnsupportedLanguage(input.language.clone()))?;

        let test_cases = self.store.list_test_cases(input.problem_id).await?;
        if test_cases.is_empty() {
            return Err(AppError::NotFound(format!(
                "Problem {} has no test cases",
                input.problem_id
            )));
        }

        let submission = Submission::new(input);
        self.store.insert_submission(&submission).await?;
        info!(submission_id = %submission.id, test_cases = test_cases.len(), "Submission accepted");

        self.enqueue(&submission, test_cases).await?;
        self.get(submission.id).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Submission, AppError> {
        self.store
            .get_submission(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Submission not found".into()))
    }

    #[instrument(skip_all, fields(submission_id = %submission.id))]
    async fn enqueue(
        &self,
        submission: &Submission,
        test_cases: Vec<TestCase>,
    ) -> Result<(), AppError> {
        let job = JudgeJob {
            submission_id: submission.id,
            problem_id: submission.problem_id,
            code: submission.code.clone(),
            language: submission.language.clone(),
            limits: submission.limits,
            test_cases,
            queued_at: Utc::now(),
        };
        let options = EnqueueOptions {
            max_retries: self.delivery.max_retries,
            timeout: self.delivery.task_timeout(),
            dedup_key: submission.id.to_string(),
            dedup_ttl: Duration::from_secs(self.delivery.dedup_ttl_secs),
        };

        let published = match Task::judge(&job) {
            Ok(task) => self
                .queue
                .enqueue(&task, &options)
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match published {
            Ok(EnqueueOutcome::Enqueued) => info!("Judge task enqueued"),
            Ok(EnqueueOutcome::Duplicate) => warn!("Judge task already enqueued"),
            Err(detail) => {
                error!(error = %detail, "Failed to enqueue judge task");
                if let Err(e) = self
                    .store
                    .fail_submission(submission.id, error_code::ENQUEUE_FAILED, &detail)
                    .await
                {
                    error!(error = %e, "Failed to record enqueue failure");
                }
                return Err(AppError::Internal(format!("enqueue failed: {detail}")));
            }
        }

        // A fast worker may already have moved it to Processing.
        self.store.mark_queued(submission.id).await?;
        Ok(())
    }
}
