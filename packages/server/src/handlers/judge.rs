use axum::Json;
use axum::extract::State;
use exec_client::ExecutionOutcome;
use tracing::{debug, instrument};

use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::judging::Completion;
use crate::models::judge::CallbackAck;
use crate::state::AppState;

#[utoipa::path(
    put,
    path = "/callback",
    tag = "Judge",
    operation_id = "judgeCallback",
    summary = "Receive an execution result",
    description = "Called by the execution backend when a run finishes (PUT or POST). Unknown or already processed tokens are acknowledged and ignored. A 500 asks the backend to deliver again.",
    request_body = ExecutionOutcome,
    responses(
        (status = 200, description = "Result processed or ignored", body = CallbackAck),
        (status = 400, description = "Missing token (VALIDATION_ERROR)", body = ErrorBody),
        (status = 500, description = "Result could not be stored (INTERNAL_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip_all, fields(token))]
pub async fn judge_callback(
    State(state): State<AppState>,
    AppJson(outcome): AppJson<ExecutionOutcome>,
) -> Result<Json<CallbackAck>, AppError> {
    let token = outcome
        .token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Validation("Callback is missing the token".into()))?;
    tracing::Span::current().record("token", token);

    let completion = state
        .aggregator
        .on_test_completion(token, &outcome)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    match completion {
        Completion::Folded(_) => Ok(Json(CallbackAck::PROCESSED)),
        other => {
            debug!(?other, "Callback ignored");
            Ok(Json(CallbackAck::IGNORED))
        }
    }
}
