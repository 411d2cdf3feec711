use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Call control
        .route("/calls", post(handlers::start_call).get(handlers::list_calls))
        .route("/calls/:call_id/end", post(handlers::end_call))
        // Call queries
        .route("/calls/:call_id/status", get(handlers::get_call_status))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
