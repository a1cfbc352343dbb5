use axum::{routing::get, routing::post, Router};

use crate::http::intake;
use crate::sse::handler as sse_handler;
use crate::state::AppState;

/// Build the full axum Router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/widgets/{id}", post(intake::submit_widget))
        .route("/dashboards/{id}", post(intake::submit_dashboard))
        .route("/events", get(sse_handler::events_stream))
        .route("/health", get(health_check))
        .with_state(state)
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
