//! Axum router configuration for all endpoints

use axum::{middleware, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::server::handlers::{feedback, jobs, status};
use crate::server::middleware::request_context_middleware;
use crate::server::state::AppState;

/// Create the application router with its middleware stack
pub fn create_router(state: AppState) -> Router {
  Router::new()
    // Status and version endpoints
    .route("/health", get(status::health))
    .route("/version", get(status::version))
    .route("/api", get(status::api_info))
    // Feedback endpoints
    .route("/feedback", get(feedback::list_feedback).post(feedback::submit_feedback))
    // Background triage history
    .route("/jobs", get(jobs::list_jobs))
    .with_state(state)
    .layer(
      ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(request_context_middleware)),
    )
}
