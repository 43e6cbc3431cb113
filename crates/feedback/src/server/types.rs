//! REST API types with schemars annotations for schema generation

use axum::{
  http::StatusCode,
  response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::server::error::FeedbackError;
use crate::server::models::feedback::FeedbackSummary;
use crate::server::services::jobs::JobRecord;

// Errors
// ======

/// API error information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ApiError {
  /// Error key, unique to the error source
  pub key: String,

  /// Human readable error message
  pub message: String,
}

impl ApiError {
  pub fn new(key: &str, message: &str) -> Self {
    Self { key: key.to_string(), message: message.to_string() }
  }
}

/// Body of every error response
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ErrorResponse {
  pub errors: Vec<ApiError>,
}

impl ErrorResponse {
  pub fn new(errors: Vec<ApiError>) -> Self {
    Self { errors }
  }
}

impl FeedbackError {
  pub fn status_code(&self) -> StatusCode {
    match self {
      FeedbackError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
      FeedbackError::NotFound(_) => StatusCode::NOT_FOUND,
      FeedbackError::QueueUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for FeedbackError {
  fn into_response(self) -> Response {
    let body = ErrorResponse::new(vec![ApiError::new(self.key(), &self.to_string())]);
    (self.status_code(), Json(body)).into_response()
  }
}

// Feedback Endpoints
// ==================

/// Request body for POST /feedback
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FeedbackSubmission {
  /// Submitter email address
  #[schemars(length(min = 3, max = 140))]
  pub customer_email: String,

  /// Submitter name
  #[schemars(length(min = 3, max = 140))]
  pub customer_name: String,

  /// Short summary of the feedback
  #[schemars(length(min = 5))]
  pub feedback_title: String,

  /// Full feedback text
  #[schemars(length(min = 5))]
  pub feedback_description: String,
}

const IDENTITY_MIN: usize = 3;
const IDENTITY_MAX: usize = 140;
const TEXT_MIN: usize = 5;

impl FeedbackSubmission {
  /// Check field lengths (in characters); returns one error per offending field
  pub fn validate(&self) -> Vec<ApiError> {
    let mut errors = Vec::new();

    check_length(&mut errors, "customer_email", &self.customer_email, IDENTITY_MIN, Some(IDENTITY_MAX));
    check_length(&mut errors, "customer_name", &self.customer_name, IDENTITY_MIN, Some(IDENTITY_MAX));
    check_length(&mut errors, "feedback_title", &self.feedback_title, TEXT_MIN, None);
    check_length(&mut errors, "feedback_description", &self.feedback_description, TEXT_MIN, None);

    errors
  }
}

fn check_length(errors: &mut Vec<ApiError>, field: &str, value: &str, min: usize, max: Option<usize>) {
  let length = value.chars().count();

  if length < min {
    errors.push(ApiError::new(field, &format!("must be at least {min} characters, got {length}")));
  } else if let Some(max) = max.filter(|&max| length > max) {
    errors.push(ApiError::new(field, &format!("must be at most {max} characters, got {length}")));
  }
}

/// Acknowledgement returned once a submission is queued
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MessageResponse {
  pub message: String,
}

/// Stored feedback as returned by GET /feedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FeedbackItem {
  /// Record identifier
  #[serde(rename = "_id")]
  pub id: String,

  pub customer_email: String,

  pub customer_name: String,

  pub feedback_title: String,

  pub feedback_description: String,

  /// Number of submissions counted against this topic
  pub upvotes: u64,

  pub created_at: DateTime<Utc>,
}

impl From<FeedbackSummary> for FeedbackItem {
  fn from(summary: FeedbackSummary) -> Self {
    Self {
      id: summary.id,
      customer_email: summary.email,
      customer_name: summary.name,
      feedback_title: summary.title,
      feedback_description: summary.description,
      upvotes: summary.upvotes,
      created_at: summary.created_at,
    }
  }
}

// Status Endpoints
// ================

/// Response for /health endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct HealthResponse {
  pub status: String,
}

/// Response for /version endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct VersionResponse {
  /// Current API version
  pub version: String,
}

/// Response for /api endpoint
#[derive(Debug, Serialize)]
pub struct ApiInfoResponse {
  /// Current API version
  pub version: String,

  /// JSON schema of the POST /feedback body
  pub submission_schema: schemars::schema::RootSchema,
}

// Jobs Endpoint
// =============

/// Query parameters for /jobs
#[derive(Debug, Default, Deserialize)]
pub struct JobsQuery {
  /// Maximum number of records to return
  pub limit: Option<usize>,

  /// succeeded, failed or all
  pub status: Option<String>,
}

/// Response for /jobs endpoint
#[derive(Debug, Serialize)]
pub struct JobsResponse {
  pub jobs: Vec<JobRecord>,
  pub count: usize,
}
