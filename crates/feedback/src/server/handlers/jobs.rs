//! Triage job history handler

use axum::{
  extract::{rejection::QueryRejection, Query, State},
  response::Json,
};

use crate::server::error::FeedbackError;
use crate::server::state::AppState;
use crate::server::types::{JobsQuery, JobsResponse};

const STATUS_FILTERS: [&str; 3] = ["succeeded", "failed", "all"];

/// GET /jobs - Recent triage outcomes, newest first
pub async fn list_jobs(
  State(state): State<AppState>,
  query: Result<Query<JobsQuery>, QueryRejection>,
) -> Result<Json<JobsResponse>, FeedbackError> {
  let Query(query) = query.map_err(|rejection| FeedbackError::Validation(rejection.body_text()))?;

  if let Some(status) = query.status.as_deref() {
    if !STATUS_FILTERS.contains(&status) {
      return Err(FeedbackError::Validation(format!(
        "status must be one of {}, got '{status}'",
        STATUS_FILTERS.join(", ")
      )));
    }
  }

  let jobs = state.jobs.recent(query.limit, query.status.as_deref()).await;
  let count = jobs.len();
  Ok(Json(JobsResponse { jobs, count }))
}
