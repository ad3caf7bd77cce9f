#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether a dispatched test case still awaits its result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "PascalCase")]
pub enum EntryStatus {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Dispatched"))]
    Dispatched,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Completed"))]
    Completed,
}

/// Maps an execution token back to the test case it runs.
///
/// At most one entry exists per `(submission_id, test_case_id)`, and a token is
/// claimed at most once: `Dispatched -> Completed` happens exactly one time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationEntry {
    pub token: String,
    pub submission_id: Uuid,
    pub test_case_id: Uuid,
    pub position: i32,
    pub hidden: bool,
    pub expected_output: String,
    pub status: EntryStatus,
    pub dispatched_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Set once the result was folded into the submission (or abandoned).
    pub consumed_at: Option<DateTime<Utc>>,
}

impl CorrelationEntry {
    pub fn dispatched(
        token: impl Into<String>,
        submission_id: Uuid,
        test_case: &crate::TestCase,
    ) -> Self {
        Self {
            token: token.into(),
            submission_id,
            test_case_id: test_case.id,
            position: test_case.position,
            hidden: test_case.hidden,
            expected_output: test_case.expected_output.clone(),
            status: EntryStatus::Dispatched,
            dispatched_at: Utc::now(),
            completed_at: None,
            consumed_at: None,
        }
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }
}
