use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::config::JudgeConfig;
use common::{BeginProcessing, CorrelationEntry, JudgeJob, SubmissionStatus, TestCase, error_code};
use exec_client::{ExecError, ExecutionBackend, ExecutionRequest, language_id};
use futures::{StreamExt, stream};
use store::{CorrelationStore, JudgeStore, StoreError, SubmissionRepository};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::error::Result;

/// Fan-out tunables.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub callback_url: String,
    /// Dispatches in flight per submission.
    pub concurrency: usize,
    /// Measured from the moment the submission was queued.
    pub judging_budget: Duration,
}

impl From<&JudgeConfig> for DispatchSettings {
    fn from(config: &JudgeConfig) -> Self {
        Self {
            callback_url: config.callback_url(),
            concurrency: config.dispatch_concurrency,
            judging_budget: config.judging_budget(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgeOutcome {
    /// Every test case now has a correlation entry.
    Dispatched { dispatched: usize, skipped: usize },
    /// Redelivery of a task whose submission already has a verdict.
    AlreadyFinal(SubmissionStatus),
    /// The job could not be judged at all; submission moved to `SystemError`.
    Rejected { code: &'static str },
    /// The backend failed part-way; earlier entries stay live.
    DispatchFailed { dispatched: usize },
    /// The judging budget ran out during fan-out.
    TimedOut,
}

enum FanOut {
    Complete(usize),
    Aborted { dispatched: usize, error: ExecError },
}

enum DispatchFailure {
    Backend(ExecError),
    Store(StoreError),
}

/// Turns one queued submission into one backend run per test case.
pub struct Orchestrator {
    store: Arc<dyn JudgeStore>,
    backend: Arc<dyn ExecutionBackend>,
    settings: DispatchSettings,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn JudgeStore>,
        backend: Arc<dyn ExecutionBackend>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            store,
            backend,
            settings,
        }
    }

    /// Dispatch every test case of `job` that has not been dispatched yet.
    ///
    /// Safe to call again for the same job: the total is fixed on the first call,
    /// test cases with an entry are skipped and a decided submission is left alone.
    /// Only persistence failures are returned as errors; everything else ends in
    /// the submission's status.
    #[instrument(skip_all, fields(submission_id = %job.submission_id))]
    pub async fn start_judging(&self, job: &JudgeJob) -> Result<JudgeOutcome> {
        let id = job.submission_id;

        if let Some((code, message)) = reject_reason(job) {
            warn!(code, %message, "Rejecting job");
            self.store.fail_submission(id, code, &message).await?;
            return Ok(JudgeOutcome::Rejected { code });
        }

        let total = i32::try_from(job.test_cases.len()).unwrap_or(i32::MAX);
        match self.store.begin_processing(id, total).await? {
            BeginProcessing::AlreadyFinal(status) => {
                info!(%status, "Submission already judged, skipping");
                return Ok(JudgeOutcome::AlreadyFinal(status));
            }
            BeginProcessing::Resumed { total } => {
                info!(total, "Resuming fan-out of redelivered task");
            }
            BeginProcessing::Started => {
                info!(total, "Starting fan-out");
            }
        }

        let already: HashSet<_> = self
            .store
            .dispatched_test_cases(id)
            .await?
            .into_iter()
            .collect();
        let mut pending: Vec<TestCase> = job
            .test_cases
            .iter()
            .filter(|tc| !already.contains(&tc.id))
            .cloned()
            .collect();
        pending.sort_by_key(|tc| tc.order_key());
        let skipped = job.test_cases.len() - pending.len();

        let budget = remaining_budget(job.queued_at, self.settings.judging_budget, Utc::now());
        match tokio::time::timeout(budget, self.fan_out(job, pending)).await {
            Ok(Ok(FanOut::Complete(dispatched))) => {
                info!(dispatched, skipped, "Fan-out complete");
                Ok(JudgeOutcome::Dispatched {
                    dispatched,
                    skipped,
                })
            }
            Ok(Ok(FanOut::Aborted { dispatched, error })) => {
                error!(dispatched, error = %error, "Dispatch failed, stopping fan-out");
                self.store
                    .fail_submission(id, error_code::DISPATCH_FAILED, &error.to_string())
                    .await?;
                Ok(JudgeOutcome::DispatchFailed { dispatched })
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => {
                error!(
                    budget_secs = self.settings.judging_budget.as_secs(),
                    "Judging budget exceeded during fan-out"
                );
                self.store
                    .fail_submission(
                        id,
                        error_code::BACKEND_TIMEOUT,
                        "judging budget exceeded before all test cases were dispatched",
                    )
                    .await?;
                Ok(JudgeOutcome::TimedOut)
            }
        }
    }

    // Dispatches start in position order; dropping the stream cancels those still in flight.
    async fn fan_out(
        &self,
        job: &JudgeJob,
        pending: Vec<TestCase>,
    ) -> std::result::Result<FanOut, StoreError> {
        let pending_ids: HashSet<Uuid> = pending.iter().map(|tc| tc.id).collect();
        let template = ExecutionRequest {
            source_code: job.code.clone(),
            language: job.language.clone(),
            stdin: String::new(),
            expected_output: String::new(),
            cpu_time_limit_secs: job.limits.time_limit_secs(),
            memory_limit_kb: job.limits.memory_limit_kb,
            callback_url: Some(self.settings.callback_url.clone()),
        };
        let mut dispatches = stream::iter(pending)
            .map(|tc| {
                dispatch_one(
                    Arc::clone(&self.store),
                    Arc::clone(&self.backend),
                    template.clone(),
                    job.submission_id,
                    tc,
                )
            })
            .buffered(self.settings.concurrency.max(1));

        let mut dispatched = 0;
        let failure = loop {
            match dispatches.next().await {
                Some(Ok(())) => dispatched += 1,
                Some(Err(DispatchFailure::Backend(error))) => break error,
                Some(Err(DispatchFailure::Store(e))) => return Err(e),
                None => return Ok(FanOut::Complete(dispatched)),
            }
        };
        drop(dispatches);

        // Later dispatches may have finished before the failing one was reached.
        let dispatched = self
            .store
            .dispatched_test_cases(job.submission_id)
            .await?
            .into_iter()
            .filter(|id| pending_ids.contains(id))
            .count();
        Ok(FanOut::Aborted {
            dispatched,
            error: failure,
        })
    }
}

// Owns everything it touches so the fan-out future stays `Send` for any caller.
async fn dispatch_one(
    store: Arc<dyn JudgeStore>,
    backend: Arc<dyn ExecutionBackend>,
    template: ExecutionRequest,
    submission_id: Uuid,
    tc: TestCase,
) -> std::result::Result<(), DispatchFailure> {
    let request = ExecutionRequest {
        stdin: tc.input.clone(),
        expected_output: tc.expected_output.clone(),
        ..template
    };
    let token = backend
        .submit(&request)
        .await
        .map_err(DispatchFailure::Backend)?;

    let entry = CorrelationEntry::dispatched(&token, submission_id, &tc);
    match store.put_entry(&entry).await {
        Ok(()) => {
            debug!(token = %token, test_case_id = %tc.id, position = tc.position, "Dispatched");
            Ok(())
        }
        Err(StoreError::Conflict(detail)) => {
            warn!(
                token = %token,
                test_case_id = %tc.id,
                %detail,
                "Test case already dispatched, dropping token"
            );
            Ok(())
        }
        Err(e) => Err(DispatchFailure::Store(e)),
    }
}

fn reject_reason(job: &JudgeJob) -> Option<(&'static str, String)> {
    if job.test_cases.is_empty() {
        return Some((error_code::NO_TEST_CASES, "problem has no test cases".into()));
    }
    if !job.limits.is_valid() {
        return Some((
            error_code::INVALID_LIMITS,
            format!(
                "limits must be positive (time {} ms, memory {} KB)",
                job.limits.time_limit_ms, job.limits.memory_limit_kb
            ),
        ));
    }
    if let Err(e) = language_id(&job.language) {
        return Some((error_code::UNSUPPORTED_LANGUAGE, e.to_string()));
    }
    None
}

fn remaining_budget(queued_at: DateTime<Utc>, budget: Duration, now: DateTime<Utc>) -> Duration {
    let elapsed = (now - queued_at).to_std().unwrap_or(Duration::ZERO);
    budget.saturating_sub(elapsed)
}
