use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    BeginProcessing, CorrelationEntry, EntryStatus, FoldOutcome, Submission, TestCase,
    TestCompletion,
};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::traits::{CorrelationStore, SubmissionRepository, TestCaseRepository};

/// Process-local store.
///
/// DashMap shard locks give the per-submission serialization; no guard is ever
/// held across an await point.
#[derive(Debug, Default)]
pub struct MemoryStore {
    submissions: DashMap<Uuid, Submission>,
    test_cases: DashMap<Uuid, TestCase>,
    entries: DashMap<String, CorrelationEntry>,
    /// (submission, test case) -> token
    pairs: DashMap<(Uuid, Uuid), String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_submission<R>(&self, id: Uuid, f: impl FnOnce(&mut Submission) -> R) -> StoreResult<R> {
        let mut submission = self
            .submissions
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("submission {id}")))?;
        Ok(f(submission.value_mut()))
    }

    /// Snapshot of an entry, for inspection in tests.
    pub fn entry(&self, token: &str) -> Option<CorrelationEntry> {
        self.entries.get(token).map(|e| e.clone())
    }

    /// Entries of one submission in test order, for inspection in tests.
    pub fn entries_for(&self, submission_id: Uuid) -> Vec<CorrelationEntry> {
        let mut entries: Vec<CorrelationEntry> = self
            .entries
            .iter()
            .filter(|e| e.submission_id == submission_id)
            .map(|e| e.clone())
            .collect();
        entries.sort_by_key(|e| (e.position, e.test_case_id));
        entries
    }

    /// Snapshot of every submission, for inspection in tests.
    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.iter().map(|s| s.clone()).collect()
    }
}

#[async_trait]
impl SubmissionRepository for MemoryStore {
    async fn insert_submission(&self, submission: &Submission) -> StoreResult<()> {
        match self.submissions.entry(submission.id) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "submission {} exists",
                submission.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(submission.clone());
                Ok(())
            }
        }
    }

    async fn get_submission(&self, id: Uuid) -> StoreResult<Option<Submission>> {
        Ok(self.submissions.get(&id).map(|s| s.clone()))
    }

    async fn mark_queued(&self, id: Uuid) -> StoreResult<bool> {
        self.with_submission(id, Submission::mark_queued)
    }

    async fn begin_processing(&self, id: Uuid, total: i32) -> StoreResult<BeginProcessing> {
        Ok(self.with_submission(id, |s| s.begin_processing(total))??)
    }

    async fn fold_completion(
        &self,
        id: Uuid,
        completion: &TestCompletion,
    ) -> StoreResult<FoldOutcome> {
        self.with_submission(id, |s| s.fold_completion(completion))
    }

    async fn fail_submission(&self, id: Uuid, code: &str, message: &str) -> StoreResult<bool> {
        self.with_submission(id, |s| s.fail(code, message))
    }

    async fn overdue_submissions(
        &self,
        cutoff: DateTime<Utc>,
        limit: u64,
    ) -> StoreResult<Vec<Uuid>> {
        let mut overdue: Vec<(DateTime<Utc>, Uuid)> = self
            .submissions
            .iter()
            .filter(|s| !s.status.is_final())
            .filter_map(|s| s.queued_at.filter(|at| *at < cutoff).map(|at| (at, s.id)))
            .collect();
        overdue.sort();
        Ok(overdue
            .into_iter()
            .take(limit as usize)
            .map(|(_, id)| id)
            .collect())
    }
}

#[async_trait]
impl TestCaseRepository for MemoryStore {
    async fn insert_test_cases(&self, cases: &[TestCase]) -> StoreResult<()> {
        for case in cases {
            self.test_cases.insert(case.id, case.clone());
        }
        Ok(())
    }

    async fn list_test_cases(&self, problem_id: Uuid) -> StoreResult<Vec<TestCase>> {
        let mut cases: Vec<TestCase> = self
            .test_cases
            .iter()
            .filter(|tc| tc.problem_id == problem_id)
            .map(|tc| tc.clone())
            .collect();
        common::test_case::sort_for_judging(&mut cases);
        Ok(cases)
    }

    async fn get_test_case(&self, problem_id: Uuid, id: Uuid) -> StoreResult<Option<TestCase>> {
        Ok(self
            .test_cases
            .get(&id)
            .filter(|tc| tc.problem_id == problem_id)
            .map(|tc| tc.clone()))
    }

    async fn update_test_case(&self, case: &TestCase) -> StoreResult<bool> {
        match self.test_cases.get_mut(&case.id) {
            Some(mut existing) if existing.problem_id == case.problem_id => {
                *existing = case.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_test_case(&self, problem_id: Uuid, id: Uuid) -> StoreResult<bool> {
        Ok(self
            .test_cases
            .remove_if(&id, |_, tc| tc.problem_id == problem_id)
            .is_some())
    }
}

#[async_trait]
impl CorrelationStore for MemoryStore {
    async fn put_entry(&self, entry: &CorrelationEntry) -> StoreResult<()> {
        if self.entries.contains_key(&entry.token) {
            return Err(StoreError::Conflict(format!("token {} exists", entry.token)));
        }
        match self.pairs.entry((entry.submission_id, entry.test_case_id)) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "test case {} of submission {} already dispatched",
                entry.test_case_id, entry.submission_id
            ))),
            Entry::Vacant(slot) => {
                self.entries.insert(entry.token.clone(), entry.clone());
                slot.insert(entry.token.clone());
                Ok(())
            }
        }
    }

    async fn take_by_token(&self, token: &str) -> StoreResult<CorrelationEntry> {
        match self.entries.get_mut(token) {
            Some(mut entry) if entry.status == EntryStatus::Dispatched => {
                entry.status = EntryStatus::Completed;
                entry.completed_at = Some(Utc::now());
                Ok(entry.clone())
            }
            _ => Err(StoreError::NotFound(format!("token {token}"))),
        }
    }

    async fn release(&self, token: &str) -> StoreResult<()> {
        if let Some(mut entry) = self.entries.get_mut(token)
            && entry.consumed_at.is_none()
        {
            entry.status = EntryStatus::Dispatched;
            entry.completed_at = None;
        }
        Ok(())
    }

    async fn mark_consumed(&self, token: &str) -> StoreResult<()> {
        let mut entry = self
            .entries
            .get_mut(token)
            .ok_or_else(|| StoreError::NotFound(format!("token {token}")))?;
        if entry.consumed_at.is_none() {
            let now = Utc::now();
            entry.status = EntryStatus::Completed;
            entry.completed_at.get_or_insert(now);
            entry.consumed_at = Some(now);
        }
        Ok(())
    }

    async fn dispatched_test_cases(&self, submission_id: Uuid) -> StoreResult<Vec<Uuid>> {
        Ok(self
            .pairs
            .iter()
            .filter(|p| p.key().0 == submission_id)
            .map(|p| p.key().1)
            .collect())
    }

    async fn stale_entries(
        &self,
        cutoff: DateTime<Utc>,
        limit: u64,
    ) -> StoreResult<Vec<CorrelationEntry>> {
        let mut stale: Vec<CorrelationEntry> = self
            .entries
            .iter()
            .filter(|e| {
                e.consumed_at.is_none()
                    && e.dispatched_at < cutoff
                    && e.completed_at.is_none_or(|at| at < cutoff)
            })
            .map(|e| e.clone())
            .collect();
        stale.sort_by_key(|e| e.dispatched_at);
        stale.truncate(limit as usize);
        Ok(stale)
    }
}
