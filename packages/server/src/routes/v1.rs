use axum::routing::post;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::health::health))
        .nest("/submissions", submission_routes())
        .nest("/problems/{id}/test-cases", test_case_routes())
        .nest("/judge", judge_routes())
        .nest("/admin", admin_routes())
}

fn submission_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::submission::create_submission))
        .routes(routes!(handlers::submission::get_submission))
}

fn test_case_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::test_case::list_test_cases,
            handlers::test_case::create_test_cases
        ))
        .routes(routes!(
            handlers::test_case::get_test_case,
            handlers::test_case::update_test_case,
            handlers::test_case::delete_test_case
        ))
}

fn judge_routes() -> OpenApiRouter<AppState> {
    // PUT is documented, POST is accepted as well.
    OpenApiRouter::new()
        .routes(routes!(handlers::judge::judge_callback))
        .route("/callback", post(handlers::judge::judge_callback))
}

fn admin_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::admin::rejudge_submission))
        .routes(routes!(handlers::admin::abort_submission))
}
