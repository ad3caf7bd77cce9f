use common::EntryStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "correlation_entry")]
pub struct Model {
    /// Backend token.
    #[sea_orm(primary_key, auto_increment = false)]
    pub token: String,

    #[sea_orm(unique_key = "submission_test_case", indexed)]
    pub submission_id: Uuid,
    #[sea_orm(unique_key = "submission_test_case")]
    pub test_case_id: Uuid,
    pub position: i32,
    pub hidden: bool,
    #[sea_orm(column_type = "Text")]
    pub expected_output: String,

    #[sea_orm(indexed)]
    pub status: EntryStatus,
    #[sea_orm(indexed)]
    pub dispatched_at: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
    pub consumed_at: Option<DateTimeUtc>,
}

impl ActiveModelBehavior for ActiveModel {}
