pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod judging;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use std::time::Duration;

use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::CorsConfig;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Gavel Judge API",
        version = "1.0.0",
        description = "Submission judging pipeline: accepts code, fans it out to an execution backend and aggregates a verdict"
    ),
    tags(
        (name = "Submissions", description = "Create submissions and read their verdicts"),
        (name = "Test Cases", description = "Test case management for problems"),
        (name = "Judge", description = "Execution backend callbacks"),
        (name = "Admin", description = "Rejudge and abort"),
        (name = "Health", description = "Liveness"),
    ),
)]
struct ApiDoc;

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(config.max_age));
    if origins.is_empty() {
        layer
    } else {
        layer.allow_origin(origins)
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let cors = cors_layer(&state.config.server.cors);
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api", routes::api_routes())
        .split_for_parts();

    router
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
