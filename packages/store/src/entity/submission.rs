use common::SubmissionStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "submission")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,
    #[sea_orm(indexed)]
    pub problem_id: Uuid,
    /// NULL for standalone submissions.
    pub contest_id: Option<Uuid>,

    #[sea_orm(column_type = "Text")]
    pub code: String,
    pub language: String,
    pub time_limit_ms: i32,
    pub memory_limit_kb: i32,

    #[sea_orm(indexed)]
    pub status: SubmissionStatus,
    pub score: i32,
    pub test_cases_passed: i32,
    pub total_test_cases: i32,
    pub max_time_ms: i32,
    pub max_memory_kb: i32,

    /// Result lines as a JSON array, kept in test ordering position.
    #[sea_orm(column_type = "JsonBinary")]
    pub results: Json,
    pub failed_test_case: Option<Uuid>,

    #[sea_orm(column_type = "Text", nullable)]
    pub compile_output: Option<String>,
    pub error_code: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,

    pub submitted_at: DateTimeUtc,
    #[sea_orm(indexed)]
    pub queued_at: Option<DateTimeUtc>,
    pub judge_completed_at: Option<DateTimeUtc>,
}

impl ActiveModelBehavior for ActiveModel {}
