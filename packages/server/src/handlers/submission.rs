use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::submission::*;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/",
    tag = "Submissions",
    operation_id = "createSubmission",
    summary = "Submit code for judging",
    description = "Validates the submission, stores it and enqueues one judge task. The response carries the id to poll; the verdict arrives asynchronously.",
    request_body = CreateSubmissionRequest,
    responses(
        (status = 201, description = "Submission queued", body = SubmissionCreated),
        (status = 400, description = "Validation error (VALIDATION_ERROR, UNSUPPORTED_LANGUAGE)", body = ErrorBody),
        (status = 404, description = "Problem has no test cases (NOT_FOUND)", body = ErrorBody),
        (status = 500, description = "Task could not be enqueued (INTERNAL_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(problem_id = %payload.problem_id))]
pub async fn create_submission(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateSubmissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let submission = state.submissions.create(payload.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(SubmissionCreated::from(&submission)),
    ))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Submissions",
    operation_id = "getSubmission",
    summary = "Get submission status",
    description = "Returns the submission with its current status, counters and ordered result lines.",
    params(("id" = Uuid, Path, description = "Submission ID")),
    responses(
        (status = 200, description = "Submission details", body = SubmissionResponse),
        (status = 404, description = "Submission not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_submission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let submission = state.submissions.get(id).await?;
    Ok(Json(submission.into()))
}
