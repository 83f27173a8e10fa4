pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::assessments::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Assessment attempts
        .route(
            "/api/v1/assessments/:id/attempts/start",
            post(handlers::handle_start_attempt),
        )
        .route(
            "/api/v1/assessments/:id/attempts/:attempt_id/save",
            post(handlers::handle_save_draft),
        )
        .route(
            "/api/v1/assessments/:id/attempts/:attempt_id/submit",
            post(handlers::handle_submit_attempt),
        )
        .route(
            "/api/v1/assessments/:id/attempts/:attempt_id/review",
            get(handlers::handle_get_review),
        )
        .with_state(state)
}
