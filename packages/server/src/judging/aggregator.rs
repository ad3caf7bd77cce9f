use std::sync::Arc;

use common::{CorrelationEntry, FoldOutcome, TestCompletion, Verdict};
use exec_client::{ExecutionOutcome, status};
use store::{CorrelationStore, JudgeStore, StoreResult, SubmissionRepository};
use tracing::{debug, info, instrument, warn};

/// Map a backend status id to a verdict. `None` while the run is not finished.
pub fn classify(status_id: i32) -> Option<Verdict> {
    match status_id {
        status::IN_QUEUE | status::PROCESSING => None,
        status::ACCEPTED => Some(Verdict::Accepted),
        status::WRONG_ANSWER => Some(Verdict::WrongAnswer),
        status::TIME_LIMIT_EXCEEDED => Some(Verdict::TimeLimitExceeded),
        status::COMPILATION_ERROR => Some(Verdict::CompilationError),
        status::RUNTIME_ERROR_FIRST..=status::RUNTIME_ERROR_LAST => Some(Verdict::RuntimeError),
        _ => Some(Verdict::SystemError),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Folded(FoldOutcome),
    /// The backend reported an intermediate status.
    NotTerminal,
    /// Unknown or already consumed token.
    CorrelationMiss,
}

/// Folds execution outcomes into their submissions.
///
/// Callbacks and reconciler polls both land here.
pub struct Aggregator {
    store: Arc<dyn JudgeStore>,
}

impl Aggregator {
    pub fn new(store: Arc<dyn JudgeStore>) -> Self {
        Self { store }
    }

    /// Only store failures are errors; the claim is released first so a
    /// redelivery can try again.
    #[instrument(skip(self, outcome), fields(status_id = outcome.status.id))]
    pub async fn on_test_completion(
        &self,
        token: &str,
        outcome: &ExecutionOutcome,
    ) -> StoreResult<Completion> {
        let Some(verdict) = classify(outcome.status.id) else {
            debug!(description = %outcome.status.description, "Run not finished yet");
            return Ok(Completion::NotTerminal);
        };

        let entry = match self.store.take_by_token(token).await {
            Ok(entry) => entry,
            Err(e) if e.is_not_found() => {
                info!("Correlation miss, ignoring completion");
                return Ok(Completion::CorrelationMiss);
            }
            Err(e) => return Err(e),
        };

        let completion = completion_for(&entry, verdict, outcome);
        let folded = match self
            .store
            .fold_completion(entry.submission_id, &completion)
            .await
        {
            Ok(folded) => folded,
            Err(e) => {
                if let Err(release_err) = self.store.release(token).await {
                    warn!(error = %release_err, "Failed to release correlation entry");
                }
                return Err(e);
            }
        };
        self.store.mark_consumed(token).await?;

        info!(
            submission_id = %entry.submission_id,
            test_case_id = %entry.test_case_id,
            position = entry.position,
            ?verdict,
            outcome = ?folded,
            "Test completion folded"
        );
        Ok(Completion::Folded(folded))
    }
}

fn completion_for(
    entry: &CorrelationEntry,
    verdict: Verdict,
    outcome: &ExecutionOutcome,
) -> TestCompletion {
    TestCompletion {
        test_case_id: entry.test_case_id,
        position: entry.position,
        hidden: entry.hidden,
        verdict,
        time_ms: outcome.time_ms(),
        memory_kb: outcome.memory_kb(),
        expected_output: entry.expected_output.clone(),
        stdout: outcome.stdout.clone(),
        stderr: outcome.stderr.clone(),
        compile_output: outcome.compile_output.clone(),
        message: outcome.message.clone(),
    }
}
