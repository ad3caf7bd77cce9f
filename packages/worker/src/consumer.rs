use std::sync::Arc;
use std::time::Duration;

use common::retry::{RetryDecision, RetryTracker};
use common::worker::{JUDGE_TASK_TYPE, Task};
use common::error_code;
use store::{JudgeStore, SubmissionRepository};
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

use crate::orchestrator::{JudgeOutcome, Orchestrator};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskDisposition {
    Completed(JudgeOutcome),
    /// Not a judge task.
    Skipped,
    /// Payload could not be decoded.
    Rejected,
    /// Every retry failed; the submission was failed if it could be identified.
    Exhausted { attempts: usize },
}

/// Runs queue deliveries through the orchestrator with bounded retries.
///
/// Always acknowledges: failures end in the submission's status rather than
/// a poisoned message.
pub struct TaskConsumer {
    orchestrator: Arc<Orchestrator>,
    store: Arc<dyn JudgeStore>,
    retries: Arc<Mutex<RetryTracker>>,
    default_timeout: Duration,
}

impl TaskConsumer {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        store: Arc<dyn JudgeStore>,
        retries: Arc<Mutex<RetryTracker>>,
        default_timeout: Duration,
    ) -> Self {
        Self {
            orchestrator,
            store,
            retries,
            default_timeout,
        }
    }

    #[instrument(skip_all, fields(task_id = %task.id, task_type = %task.task_type))]
    pub async fn handle(&self, task: Task) -> TaskDisposition {
        if task.task_type != JUDGE_TASK_TYPE {
            warn!("Unknown task type, skipping");
            return TaskDisposition::Skipped;
        }

        let job = match task.judge_job() {
            Ok(job) => job,
            Err(e) => {
                error!(error = %e, "Failed to parse JudgeJob");
                if let Some(id) = task.submission_id() {
                    let message = format!("malformed judge task: {e}");
                    if let Err(e) = self
                        .store
                        .fail_submission(id, error_code::MALFORMED_TASK, &message)
                        .await
                    {
                        error!(submission_id = %id, error = %e, "Failed to record malformed task");
                    }
                }
                return TaskDisposition::Rejected;
            }
        };

        let timeout = match task.timeout_secs {
            0 => self.default_timeout,
            secs => Duration::from_secs(secs),
        };

        loop {
            let attempt =
                tokio::time::timeout(timeout, self.orchestrator.start_judging(&job)).await;
            let failure = match attempt {
                Ok(Ok(outcome)) => {
                    self.retries.lock().await.clear(&task.id);
                    info!(?outcome, "Task finished");
                    return TaskDisposition::Completed(outcome);
                }
                Ok(Err(e)) => e.to_string(),
                Err(_) => format!("attempt timed out after {}s", timeout.as_secs()),
            };

            let decision = self.retries.lock().await.record_failure(&task.id, &failure);
            match decision {
                RetryDecision::Retry { attempt, delay } => {
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %failure,
                        "Retrying judge task"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::Exhausted { history } => {
                    error!(
                        retry_count = history.len(),
                        error = %failure,
                        "Max retries exhausted"
                    );
                    let message = format!(
                        "processing failed after {} attempts: {failure}",
                        history.len()
                    );
                    if let Err(e) = self
                        .store
                        .fail_submission(
                            job.submission_id,
                            error_code::WORKER_PROCESSING_FAILED,
                            &message,
                        )
                        .await
                    {
                        error!(error = %e, "Failed to record exhausted task");
                    }
                    return TaskDisposition::Exhausted {
                        attempts: history.len(),
                    };
                }
            }
        }
    }
}
