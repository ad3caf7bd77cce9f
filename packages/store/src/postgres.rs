use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::config::DatabaseConfig;
use common::{
    BeginProcessing, CorrelationEntry, EntryStatus, FoldOutcome, Limits, ResultLine, Submission,
    SubmissionStatus, TestCase, TestCompletion,
};
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectOptions, Database, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use crate::entity::{correlation_entry, submission, test_case};
use crate::error::{StoreError, StoreResult};
use crate::traits::{CorrelationStore, SubmissionRepository, TestCaseRepository};

/// Connect and sync the schema of every entity in this crate.
pub async fn init_db(config: &DatabaseConfig) -> StoreResult<DatabaseConnection> {
    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    db.get_schema_registry("store::entity::*").sync(&db).await?;
    Ok(db)
}

/// PostgreSQL-backed store. Submission mutations run in a transaction holding
/// `SELECT ... FOR UPDATE` on the submission row.
#[derive(Clone, Debug)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn with_locked_submission<R, F>(&self, id: Uuid, f: F) -> StoreResult<R>
    where
        F: FnOnce(&mut Submission) -> R + Send,
        R: Send,
    {
        let txn = self.db.begin().await?;
        let Some(row) = submission::Entity::find_by_id(id)
            .lock(LockType::Update)
            .one(&txn)
            .await?
        else {
            txn.rollback().await?;
            return Err(StoreError::NotFound(format!("submission {id}")));
        };

        let mut current = submission_from_row(row)?;
        let before = current.clone();
        let result = f(&mut current);
        if current != before {
            submission_to_active(&current)?.update(&txn).await?;
        }
        txn.commit().await?;
        Ok(result)
    }
}

fn submission_from_row(row: submission::Model) -> StoreResult<Submission> {
    let results: Vec<ResultLine> = serde_json::from_value(row.results)?;
    Ok(Submission {
        id: row.id,
        user_id: row.user_id,
        problem_id: row.problem_id,
        contest_id: row.contest_id,
        code: row.code,
        language: row.language,
        limits: Limits {
            time_limit_ms: row.time_limit_ms,
            memory_limit_kb: row.memory_limit_kb,
        },
        status: row.status,
        score: row.score,
        test_cases_passed: row.test_cases_passed,
        total_test_cases: row.total_test_cases,
        max_time_ms: row.max_time_ms,
        max_memory_kb: row.max_memory_kb,
        results,
        failed_test_case: row.failed_test_case,
        compile_output: row.compile_output,
        error_code: row.error_code,
        error_message: row.error_message,
        submitted_at: row.submitted_at,
        queued_at: row.queued_at,
        judge_completed_at: row.judge_completed_at,
    })
}

fn submission_to_active(s: &Submission) -> StoreResult<submission::ActiveModel> {
    Ok(submission::ActiveModel {
        id: Set(s.id),
        user_id: Set(s.user_id),
        problem_id: Set(s.problem_id),
        contest_id: Set(s.contest_id),
        code: Set(s.code.clone()),
        language: Set(s.language.clone()),
        time_limit_ms: Set(s.limits.time_limit_ms),
        memory_limit_kb: Set(s.limits.memory_limit_kb),
        status: Set(s.status),
        score: Set(s.score),
        test_cases_passed: Set(s.test_cases_passed),
        total_test_cases: Set(s.total_test_cases),
        max_time_ms: Set(s.max_time_ms),
        max_memory_kb: Set(s.max_memory_kb),
        results: Set(serde_json::to_value(&s.results)?),
        failed_test_case: Set(s.failed_test_case),
        compile_output: Set(s.compile_output.clone()),
        error_code: Set(s.error_code.clone()),
        error_message: Set(s.error_message.clone()),
        submitted_at: Set(s.submitted_at),
        queued_at: Set(s.queued_at),
        judge_completed_at: Set(s.judge_completed_at),
    })
}

impl From<test_case::Model> for TestCase {
    fn from(row: test_case::Model) -> Self {
        Self {
            id: row.id,
            problem_id: row.problem_id,
            input: row.input,
            expected_output: row.expected_output,
            hidden: row.hidden,
            position: row.position,
            created_at: row.created_at,
        }
    }
}

fn test_case_to_active(tc: &TestCase) -> test_case::ActiveModel {
    test_case::ActiveModel {
        id: Set(tc.id),
        problem_id: Set(tc.problem_id),
        input: Set(tc.input.clone()),
        expected_output: Set(tc.expected_output.clone()),
        hidden: Set(tc.hidden),
        position: Set(tc.position),
        created_at: Set(tc.created_at),
    }
}

impl From<correlation_entry::Model> for CorrelationEntry {
    fn from(row: correlation_entry::Model) -> Self {
        Self {
            token: row.token,
            submission_id: row.submission_id,
            test_case_id: row.test_case_id,
            position: row.position,
            hidden: row.hidden,
            expected_output: row.expected_output,
            status: row.status,
            dispatched_at: row.dispatched_at,
            completed_at: row.completed_at,
            consumed_at: row.consumed_at,
        }
    }
}

#[async_trait]
impl SubmissionRepository for SeaOrmStore {
    async fn insert_submission(&self, submission: &Submission) -> StoreResult<()> {
        submission_to_active(submission)?.insert(&self.db).await?;
        Ok(())
    }

    async fn get_submission(&self, id: Uuid) -> StoreResult<Option<Submission>> {
        submission::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(submission_from_row)
            .transpose()
    }

    async fn mark_queued(&self, id: Uuid) -> StoreResult<bool> {
        self.with_locked_submission(id, Submission::mark_queued).await
    }

    async fn begin_processing(&self, id: Uuid, total: i32) -> StoreResult<BeginProcessing> {
        Ok(self
            .with_locked_submission(id, |s| s.begin_processing(total))
            .await??)
    }

    async fn fold_completion(
        &self,
        id: Uuid,
        completion: &TestCompletion,
    ) -> StoreResult<FoldOutcome> {
        let outcome = self
            .with_locked_submission(id, |s| s.fold_completion(completion))
            .await?;
        debug!(
            submission_id = %id,
            test_case_id = %completion.test_case_id,
            ?outcome,
            "Folded completion"
        );
        Ok(outcome)
    }

    async fn fail_submission(&self, id: Uuid, code: &str, message: &str) -> StoreResult<bool> {
        self.with_locked_submission(id, |s| s.fail(code, message))
            .await
    }

    async fn overdue_submissions(
        &self,
        cutoff: DateTime<Utc>,
        limit: u64,
    ) -> StoreResult<Vec<Uuid>> {
        let ids: Vec<Uuid> = submission::Entity::find()
            .select_only()
            .column(submission::Column::Id)
            .filter(submission::Column::Status.is_in(SubmissionStatus::IN_FLIGHT.iter().copied()))
            .filter(submission::Column::QueuedAt.lt(cutoff))
            .order_by_asc(submission::Column::QueuedAt)
            .limit(limit)
            .into_tuple()
            .all(&self.db)
            .await?;
        Ok(ids)
    }
}

#[async_trait]
impl TestCaseRepository for SeaOrmStore {
    async fn insert_test_cases(&self, cases: &[TestCase]) -> StoreResult<()> {
        if cases.is_empty() {
            return Ok(());
        }
        test_case::Entity::insert_many(cases.iter().map(test_case_to_active))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn list_test_cases(&self, problem_id: Uuid) -> StoreResult<Vec<TestCase>> {
        let rows = test_case::Entity::find()
            .filter(test_case::Column::ProblemId.eq(problem_id))
            .order_by_asc(test_case::Column::Position)
            .order_by_asc(test_case::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(TestCase::from).collect())
    }

    async fn get_test_case(&self, problem_id: Uuid, id: Uuid) -> StoreResult<Option<TestCase>> {
        let row = test_case::Entity::find_by_id(id)
            .filter(test_case::Column::ProblemId.eq(problem_id))
            .one(&self.db)
            .await?;
        Ok(row.map(TestCase::from))
    }

    async fn update_test_case(&self, case: &TestCase) -> StoreResult<bool> {
        let result = test_case::Entity::update_many()
            .set(test_case_to_active(case))
            .filter(test_case::Column::Id.eq(case.id))
            .filter(test_case::Column::ProblemId.eq(case.problem_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn delete_test_case(&self, problem_id: Uuid, id: Uuid) -> StoreResult<bool> {
        let result = test_case::Entity::delete_many()
            .filter(test_case::Column::Id.eq(id))
            .filter(test_case::Column::ProblemId.eq(problem_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }
}

#[async_trait]
impl CorrelationStore for SeaOrmStore {
    async fn put_entry(&self, entry: &CorrelationEntry) -> StoreResult<()> {
        correlation_entry::ActiveModel {
            token: Set(entry.token.clone()),
            submission_id: Set(entry.submission_id),
            test_case_id: Set(entry.test_case_id),
            position: Set(entry.position),
            hidden: Set(entry.hidden),
            expected_output: Set(entry.expected_output.clone()),
            status: Set(entry.status),
            dispatched_at: Set(entry.dispatched_at),
            completed_at: Set(entry.completed_at),
            consumed_at: Set(entry.consumed_at),
        }
        .insert(&self.db)
        .await?;
        Ok(())
    }

    async fn take_by_token(&self, token: &str) -> StoreResult<CorrelationEntry> {
        let txn = self.db.begin().await?;
        let row = correlation_entry::Entity::find_by_id(token.to_owned())
            .lock(LockType::Update)
            .one(&txn)
            .await?;

        let row = match row {
            Some(row) if row.status == EntryStatus::Dispatched => row,
            _ => {
                txn.rollback().await?;
                return Err(StoreError::NotFound(format!("token {token}")));
            }
        };

        let mut active: correlation_entry::ActiveModel = row.into();
        active.status = Set(EntryStatus::Completed);
        active.completed_at = Set(Some(Utc::now()));
        let claimed = active.update(&txn).await?;
        txn.commit().await?;
        Ok(claimed.into())
    }

    async fn release(&self, token: &str) -> StoreResult<()> {
        correlation_entry::Entity::update_many()
            .set(correlation_entry::ActiveModel {
                status: Set(EntryStatus::Dispatched),
                completed_at: Set(None),
                ..Default::default()
            })
            .filter(correlation_entry::Column::Token.eq(token))
            .filter(correlation_entry::Column::ConsumedAt.is_null())
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn mark_consumed(&self, token: &str) -> StoreResult<()> {
        let txn = self.db.begin().await?;
        let Some(row) = correlation_entry::Entity::find_by_id(token.to_owned())
            .lock(LockType::Update)
            .one(&txn)
            .await?
        else {
            txn.rollback().await?;
            return Err(StoreError::NotFound(format!("token {token}")));
        };

        if row.consumed_at.is_none() {
            let now = Utc::now();
            let completed_at = row.completed_at.unwrap_or(now);
            let mut active: correlation_entry::ActiveModel = row.into();
            active.status = Set(EntryStatus::Completed);
            active.completed_at = Set(Some(completed_at));
            active.consumed_at = Set(Some(now));
            active.update(&txn).await?;
        }
        txn.commit().await?;
        Ok(())
    }

    async fn dispatched_test_cases(&self, submission_id: Uuid) -> StoreResult<Vec<Uuid>> {
        let ids: Vec<Uuid> = correlation_entry::Entity::find()
            .select_only()
            .column(correlation_entry::Column::TestCaseId)
            .filter(correlation_entry::Column::SubmissionId.eq(submission_id))
            .into_tuple()
            .all(&self.db)
            .await?;
        Ok(ids)
    }

    async fn stale_entries(
        &self,
        cutoff: DateTime<Utc>,
        limit: u64,
    ) -> StoreResult<Vec<CorrelationEntry>> {
        let rows = correlation_entry::Entity::find()
            .filter(correlation_entry::Column::ConsumedAt.is_null())
            .filter(correlation_entry::Column::DispatchedAt.lt(cutoff))
            .filter(
                Condition::any()
                    .add(correlation_entry::Column::CompletedAt.is_null())
                    .add(correlation_entry::Column::CompletedAt.lt(cutoff)),
            )
            .order_by_asc(correlation_entry::Column::DispatchedAt)
            .limit(limit)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(CorrelationEntry::from).collect())
    }
}
