use axum::Json;

use crate::models::judge::HealthResponse;

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    operation_id = "health",
    summary = "Liveness check",
    responses((status = 200, description = "Server is up", body = HealthResponse)),
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
