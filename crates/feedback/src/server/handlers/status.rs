//! Health, version and API description handlers

use axum::response::Json;

use crate::server::types::{ApiInfoResponse, FeedbackSubmission, HealthResponse, VersionResponse};

/// GET /health - Liveness check
pub async fn health() -> Json<HealthResponse> {
  Json(HealthResponse { status: "ok".to_string() })
}

/// GET /version - Returns current API version
pub async fn version() -> Json<VersionResponse> {
  Json(VersionResponse { version: env!("CARGO_PKG_VERSION").to_string() })
}

/// GET /api - API version and the submission schema
pub async fn api_info() -> Json<ApiInfoResponse> {
  Json(ApiInfoResponse {
    version: env!("CARGO_PKG_VERSION").to_string(),
    submission_schema: schemars::schema_for!(FeedbackSubmission),
  })
}
