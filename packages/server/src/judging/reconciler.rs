use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::config::JudgeConfig;
use common::retry::MIN_TICK;
use common::{CorrelationEntry, EntryStatus, error_code};
use exec_client::ExecutionBackend;
use store::{CorrelationStore, JudgeStore, StoreResult, SubmissionRepository};
use tracing::{error, info, warn};

use super::aggregator::{Aggregator, Completion};

#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    /// How long a callback may take before the entry is polled.
    pub grace: Duration,
    pub judging_budget: Duration,
    pub batch_size: u64,
    pub interval: Duration,
}

impl From<&JudgeConfig> for ReconcileSettings {
    fn from(config: &JudgeConfig) -> Self {
        Self {
            grace: Duration::from_secs(config.callback_grace_secs),
            judging_budget: config.judging_budget(),
            batch_size: config.reconcile_batch_size,
            interval: Duration::from_secs(config.reconcile_interval_secs),
        }
    }
}

/// Counts from one reconcile pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    pub polled: usize,
    pub folded: usize,
    pub abandoned: usize,
    pub timed_out: usize,
}

/// Recovers lost or early callbacks by polling, and enforces the judging budget.
pub struct Reconciler {
    store: Arc<dyn JudgeStore>,
    backend: Arc<dyn ExecutionBackend>,
    aggregator: Arc<Aggregator>,
    settings: ReconcileSettings,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn JudgeStore>,
        backend: Arc<dyn ExecutionBackend>,
        aggregator: Arc<Aggregator>,
        settings: ReconcileSettings,
    ) -> Self {
        Self {
            store,
            backend,
            aggregator,
            settings,
        }
    }

    /// One pass as of `now`. Polls first so late results are folded before
    /// their submission is timed out.
    pub async fn reconcile_at(&self, now: DateTime<Utc>) -> StoreResult<ReconcileReport> {
        let mut report = ReconcileReport::default();
        let budget_cutoff = now - to_chrono(self.settings.judging_budget);

        let stale = self
            .store
            .stale_entries(now - to_chrono(self.settings.grace), self.settings.batch_size)
            .await?;
        for entry in stale {
            if entry.status == EntryStatus::Completed {
                // Claimed by a fold that never finished.
                warn!(
                    token = %entry.token,
                    submission_id = %entry.submission_id,
                    "Releasing stalled claim"
                );
                self.store.release(&entry.token).await?;
            }
            report.polled += 1;
            match self.poll_entry(&entry).await? {
                Some(Completion::Folded(_)) => report.folded += 1,
                Some(_) => {}
                None if entry.dispatched_at < budget_cutoff => {
                    self.store.mark_consumed(&entry.token).await?;
                    warn!(
                        token = %entry.token,
                        submission_id = %entry.submission_id,
                        "Abandoned entry past judging budget"
                    );
                    report.abandoned += 1;
                }
                None => {}
            }
        }

        let overdue = self
            .store
            .overdue_submissions(budget_cutoff, self.settings.batch_size)
            .await?;
        for id in overdue {
            let message = format!(
                "no verdict within {}s judging budget",
                self.settings.judging_budget.as_secs()
            );
            if self
                .store
                .fail_submission(id, error_code::BACKEND_TIMEOUT, &message)
                .await?
            {
                warn!(submission_id = %id, "Submission timed out");
                report.timed_out += 1;
            }
        }

        Ok(report)
    }

    // None when the backend has nothing final to say yet.
    async fn poll_entry(&self, entry: &CorrelationEntry) -> StoreResult<Option<Completion>> {
        let outcome = match self.backend.poll(&entry.token).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(token = %entry.token, error = %e, "Poll failed");
                return Ok(None);
            }
        };
        if !outcome.is_terminal() {
            return Ok(None);
        }
        self.aggregator
            .on_test_completion(&entry.token, &outcome)
            .await
            .map(Some)
    }
}

fn to_chrono(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or(chrono::Duration::MAX)
}

/// Run the reconciler as a background task.
pub async fn run_reconciler(reconciler: Arc<Reconciler>) {
    let every = reconciler.settings.interval;
    info!(
        interval_secs = every.as_secs(),
        grace_secs = reconciler.settings.grace.as_secs(),
        budget_secs = reconciler.settings.judging_budget.as_secs(),
        "Starting reconciler"
    );

    let mut interval = tokio::time::interval(every.max(MIN_TICK));
    loop {
        interval.tick().await;

        match reconciler.reconcile_at(Utc::now()).await {
            Ok(report) if report != ReconcileReport::default() => {
                info!(?report, "Reconcile pass finished");
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "Reconcile pass failed"),
        }
    }
}
