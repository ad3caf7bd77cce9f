use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::TestCase;
use store::TestCaseRepository;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::test_case::*;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/",
    tag = "Test Cases",
    operation_id = "createTestCases",
    summary = "Create test cases for a problem",
    description = "Accepts one test case object or an array of them. Position must be at least 1.",
    params(("id" = Uuid, Path, description = "Problem ID")),
    request_body = CreateTestCasesRequest,
    responses(
        (status = 201, description = "Test cases created", body = Vec<TestCaseResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn create_test_cases(
    State(state): State<AppState>,
    Path(problem_id): Path<Uuid>,
    AppJson(payload): AppJson<CreateTestCasesRequest>,
) -> Result<impl IntoResponse, AppError> {
    let requests = payload.into_vec();
    validate_create_test_cases(&requests)?;

    let cases: Vec<TestCase> = requests
        .into_iter()
        .map(|r| TestCase::new(problem_id, r.input, r.expected_output, r.hidden, r.position))
        .collect();
    state.store.insert_test_cases(&cases).await?;
    info!(count = cases.len(), "Test cases created");

    let body: Vec<TestCaseResponse> = cases.into_iter().map(Into::into).collect();
    Ok((StatusCode::CREATED, Json(body)))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Test Cases",
    operation_id = "listTestCases",
    summary = "List test cases for a problem",
    description = "Returns all test cases of a problem in judging order.",
    params(("id" = Uuid, Path, description = "Problem ID")),
    responses(
        (status = 200, description = "List of test cases", body = Vec<TestCaseResponse>),
    ),
)]
#[instrument(skip(state))]
pub async fn list_test_cases(
    State(state): State<AppState>,
    Path(problem_id): Path<Uuid>,
) -> Result<Json<Vec<TestCaseResponse>>, AppError> {
    let cases = state.store.list_test_cases(problem_id).await?;
    Ok(Json(cases.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/{tc_id}",
    tag = "Test Cases",
    operation_id = "getTestCase",
    summary = "Get a test case",
    params(
        ("id" = Uuid, Path, description = "Problem ID"),
        ("tc_id" = Uuid, Path, description = "Test case ID"),
    ),
    responses(
        (status = 200, description = "Test case", body = TestCaseResponse),
        (status = 404, description = "Test case not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_test_case(
    State(state): State<AppState>,
    Path((problem_id, tc_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<TestCaseResponse>, AppError> {
    let case = find_test_case(&state, problem_id, tc_id).await?;
    Ok(Json(case.into()))
}

#[utoipa::path(
    patch,
    path = "/{tc_id}",
    tag = "Test Cases",
    operation_id = "updateTestCase",
    summary = "Update a test case",
    description = "Partial update. Submissions already queued keep the test data they were enqueued with.",
    params(
        ("id" = Uuid, Path, description = "Problem ID"),
        ("tc_id" = Uuid, Path, description = "Test case ID"),
    ),
    request_body = UpdateTestCaseRequest,
    responses(
        (status = 200, description = "Test case updated", body = TestCaseResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Test case not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn update_test_case(
    State(state): State<AppState>,
    Path((problem_id, tc_id)): Path<(Uuid, Uuid)>,
    AppJson(payload): AppJson<UpdateTestCaseRequest>,
) -> Result<Json<TestCaseResponse>, AppError> {
    validate_update_test_case(&payload)?;

    let mut case = find_test_case(&state, problem_id, tc_id).await?;
    payload.apply(&mut case);
    if !state.store.update_test_case(&case).await? {
        return Err(AppError::NotFound("Test case not found".into()));
    }
    Ok(Json(case.into()))
}

#[utoipa::path(
    delete,
    path = "/{tc_id}",
    tag = "Test Cases",
    operation_id = "deleteTestCase",
    summary = "Delete a test case",
    params(
        ("id" = Uuid, Path, description = "Problem ID"),
        ("tc_id" = Uuid, Path, description = "Test case ID"),
    ),
    responses(
        (status = 204, description = "Test case deleted"),
        (status = 404, description = "Test case not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn delete_test_case(
    State(state): State<AppState>,
    Path((problem_id, tc_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    if !state.store.delete_test_case(problem_id, tc_id).await? {
        return Err(AppError::NotFound("Test case not found".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn find_test_case(
    state: &AppState,
    problem_id: Uuid,
    tc_id: Uuid,
) -> Result<TestCase, AppError> {
    state
        .store
        .get_test_case(problem_id, tc_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Test case not found".into()))
}
