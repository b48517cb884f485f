pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::workflow::handlers;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.body_limit_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/run-workflow", post(handlers::handle_run_workflow))
        .route(
            "/api/run-workflow/upload",
            post(handlers::handle_run_workflow_upload),
        )
        .route("/api/check-status", get(handlers::handle_check_status))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
