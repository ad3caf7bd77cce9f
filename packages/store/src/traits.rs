use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BeginProcessing, CorrelationEntry, FoldOutcome, Submission, TestCase, TestCompletion};
use uuid::Uuid;

use crate::error::StoreResult;

/// Submission records. Every mutating call is serialized per submission.
#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    async fn insert_submission(&self, submission: &Submission) -> StoreResult<()>;

    async fn get_submission(&self, id: Uuid) -> StoreResult<Option<Submission>>;

    /// `Pending -> Queued`. Returns false when the submission already moved on.
    async fn mark_queued(&self, id: Uuid) -> StoreResult<bool>;

    /// Enter `Processing` and fix `total_test_cases` the first time only.
    async fn begin_processing(&self, id: Uuid, total: i32) -> StoreResult<BeginProcessing>;

    async fn fold_completion(
        &self,
        id: Uuid,
        completion: &TestCompletion,
    ) -> StoreResult<FoldOutcome>;

    /// Force `SystemError`. Returns false when a verdict was already reached.
    async fn fail_submission(&self, id: Uuid, code: &str, message: &str) -> StoreResult<bool>;

    /// Non-terminal submissions queued before `cutoff`, oldest first.
    async fn overdue_submissions(
        &self,
        cutoff: DateTime<Utc>,
        limit: u64,
    ) -> StoreResult<Vec<Uuid>>;
}

#[async_trait]
pub trait TestCaseRepository: Send + Sync {
    async fn insert_test_cases(&self, cases: &[TestCase]) -> StoreResult<()>;

    /// In judging order (position, then id).
    async fn list_test_cases(&self, problem_id: Uuid) -> StoreResult<Vec<TestCase>>;

    async fn get_test_case(&self, problem_id: Uuid, id: Uuid) -> StoreResult<Option<TestCase>>;

    /// Returns false when no such test case exists.
    async fn update_test_case(&self, case: &TestCase) -> StoreResult<bool>;

    async fn delete_test_case(&self, problem_id: Uuid, id: Uuid) -> StoreResult<bool>;
}

/// Token to test-case mapping.
#[async_trait]
pub trait CorrelationStore: Send + Sync {
    /// Fails with `Conflict` if the token or the (submission, test case) pair exists.
    async fn put_entry(&self, entry: &CorrelationEntry) -> StoreResult<()>;

    /// Atomically claim a dispatched entry. Unknown or already claimed tokens are `NotFound`.
    async fn take_by_token(&self, token: &str) -> StoreResult<CorrelationEntry>;

    /// Undo a claim whose result could not be folded, so a redelivery can retry it.
    async fn release(&self, token: &str) -> StoreResult<()>;

    /// Idempotent. Also used to abandon entries that will never complete.
    async fn mark_consumed(&self, token: &str) -> StoreResult<()>;

    /// Test cases of a submission that already have an entry.
    async fn dispatched_test_cases(&self, submission_id: Uuid) -> StoreResult<Vec<Uuid>>;

    /// Unconsumed entries dispatched before `cutoff`, oldest first. Includes claims
    /// taken before `cutoff` whose fold never finished.
    async fn stale_entries(
        &self,
        cutoff: DateTime<Utc>,
        limit: u64,
    ) -> StoreResult<Vec<CorrelationEntry>>;
}

/// Everything the judging pipeline needs from persistence.
pub trait JudgeStore: SubmissionRepository + TestCaseRepository + CorrelationStore {}

impl<T> JudgeStore for T where T: SubmissionRepository + TestCaseRepository + CorrelationStore {}
