//! Feedback intake and listing handlers

use axum::{
  extract::{rejection::JsonRejection, Extension, State},
  http::StatusCode,
  response::{IntoResponse, Json, Response},
};

use crate::server::error::FeedbackError;
use crate::server::middleware::RequestContext;
use crate::server::state::AppState;
use crate::server::types::{ApiError, ErrorResponse, FeedbackItem, FeedbackSubmission, MessageResponse};

pub const SUBMITTED_MESSAGE: &str = "Feedback submitted successfully";

/// POST /feedback - Validate a submission and queue it for triage
pub async fn submit_feedback(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  payload: Result<Json<FeedbackSubmission>, JsonRejection>,
) -> Response {
  let submission = match payload {
    Ok(Json(submission)) => submission,
    Err(rejection) => {
      context.log_warn(&format!("Rejected request body: {rejection}"));
      let error = ApiError::new("invalid_body", &rejection.body_text());
      return unprocessable(vec![error]);
    }
  };

  let errors = submission.validate();
  if !errors.is_empty() {
    context.log_warn(&format!("Submission failed validation on {} field(s)", errors.len()));
    return unprocessable(errors);
  }

  match state.queue.enqueue(submission) {
    Ok(job_id) => {
      context.log_info(&format!("Queued triage job {job_id}"));
      let body = MessageResponse { message: SUBMITTED_MESSAGE.to_string() };
      (StatusCode::ACCEPTED, Json(body)).into_response()
    }
    Err(e) => {
      context.log_warn(&format!("Could not queue submission: {e}"));
      e.into_response()
    }
  }
}

/// GET /feedback - All stored feedback, without embeddings
pub async fn list_feedback(State(state): State<AppState>) -> Result<Json<Vec<FeedbackItem>>, FeedbackError> {
  let summaries = state.store.list().await?;
  Ok(Json(summaries.into_iter().map(FeedbackItem::from).collect()))
}

fn unprocessable(errors: Vec<ApiError>) -> Response {
  (StatusCode::UNPROCESSABLE_ENTITY, Json(ErrorResponse::new(errors))).into_response()
}
