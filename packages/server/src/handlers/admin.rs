use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, ErrorBody};
use crate::models::submission::{SubmissionCreated, SubmissionResponse};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/submissions/{id}/rejudge",
    tag = "Admin",
    operation_id = "rejudgeSubmission",
    summary = "Rejudge a submission",
    description = "Creates and enqueues a new submission with the same code, language and limits. The original keeps its verdict.",
    params(("id" = Uuid, Path, description = "Submission ID")),
    responses(
        (status = 201, description = "New submission queued", body = SubmissionCreated),
        (status = 404, description = "Submission not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn rejudge_submission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let fresh = state.admin.rejudge(id).await?;
    Ok((StatusCode::CREATED, Json(SubmissionCreated::from(&fresh))))
}

#[utoipa::path(
    post,
    path = "/submissions/{id}/abort",
    tag = "Admin",
    operation_id = "abortSubmission",
    summary = "Abort a submission",
    description = "Moves a submission without a verdict to SystemError. Results still in flight are folded for reporting only.",
    params(("id" = Uuid, Path, description = "Submission ID")),
    responses(
        (status = 200, description = "Submission aborted", body = SubmissionResponse),
        (status = 404, description = "Submission not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Verdict already reached (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn abort_submission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let aborted = state.admin.abort(id).await?;
    Ok(Json(aborted.into()))
}
