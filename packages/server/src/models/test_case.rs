use chrono::{DateTime, Utc};
use common::TestCase;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateTestCaseRequest {
    pub input: String,
    pub expected_output: String,
    /// Hidden test cases never show data in result lines.
    #[serde(default)]
    pub hidden: bool,
    /// Judging order, starting at 1.
    #[schema(example = 1)]
    pub position: i32,
}

/// A single test case or a batch.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum CreateTestCasesRequest {
    Many(Vec<CreateTestCaseRequest>),
    One(CreateTestCaseRequest),
}

impl CreateTestCasesRequest {
    pub fn into_vec(self) -> Vec<CreateTestCaseRequest> {
        match self {
            Self::Many(cases) => cases,
            Self::One(case) => vec![case],
        }
    }
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateTestCaseRequest {
    pub input: Option<String>,
    pub expected_output: Option<String>,
    pub hidden: Option<bool>,
    pub position: Option<i32>,
}

impl UpdateTestCaseRequest {
    pub fn apply(self, case: &mut TestCase) {
        if let Some(input) = self.input {
            case.input = input;
        }
        if let Some(expected_output) = self.expected_output {
            case.expected_output = expected_output;
        }
        if let Some(hidden) = self.hidden {
            case.hidden = hidden;
        }
        if let Some(position) = self.position {
            case.position = position;
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TestCaseResponse {
    pub id: Uuid,
    pub problem_id: Uuid,
    pub input: String,
    pub expected_output: String,
    pub hidden: bool,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

impl From<TestCase> for TestCaseResponse {
    fn from(tc: TestCase) -> Self {
        Self {
            id: tc.id,
            problem_id: tc.problem_id,
            input: tc.input,
            expected_output: tc.expected_output,
            hidden: tc.hidden,
            position: tc.position,
            created_at: tc.created_at,
        }
    }
}

fn validate_position(position: i32) -> Result<(), AppError> {
    if position < 1 {
        return Err(AppError::Validation("Position must be at least 1".into()));
    }
    Ok(())
}

pub fn validate_create_test_cases(cases: &[CreateTestCaseRequest]) -> Result<(), AppError> {
    if cases.is_empty() {
        return Err(AppError::Validation(
            "At least one test case is required".into(),
        ));
    }
    cases.iter().try_for_each(|c| validate_position(c.position))
}

pub fn validate_update_test_case(req: &UpdateTestCaseRequest) -> Result<(), AppError> {
    req.position.map_or(Ok(()), validate_position)
}
