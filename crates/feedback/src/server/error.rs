//! Error types for feedback intake, storage and triage

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FeedbackError>;

#[derive(Error, Debug)]
pub enum FeedbackError {
  #[error("Validation error: {0}")]
  Validation(String),

  #[error("Embedding service error: {0}")]
  EmbeddingService(String),

  #[error("Index query failed: {0}")]
  IndexQuery(String),

  #[error("Feedback not found: {0}")]
  NotFound(String),

  #[error("Storage write failed: {0}")]
  StorageWrite(String),

  #[error("Storage read failed: {0}")]
  StorageRead(String),

  #[error("Triage queue unavailable: {0}")]
  QueueUnavailable(String),

  #[error("Notification failed: {0}")]
  Notification(String),

  #[error("Configuration error: {0}")]
  Config(String),

  #[error("Internal error: {0}")]
  Internal(String),
}

impl FeedbackError {
  /// Whether a triage job failing with this error may be attempted again.
  ///
  /// Only failures that happen before the collection is mutated qualify, so
  /// a retried job can never add a second upvote.
  pub fn is_retryable(&self) -> bool {
    matches!(self, FeedbackError::EmbeddingService(_) | FeedbackError::IndexQuery(_))
  }

  /// Stable key used in API error bodies
  pub fn key(&self) -> &'static str {
    match self {
      FeedbackError::Validation(_) => "validation_failed",
      FeedbackError::EmbeddingService(_) => "embedding_service_error",
      FeedbackError::IndexQuery(_) => "index_query_failed",
      FeedbackError::NotFound(_) => "feedback_not_found",
      FeedbackError::StorageWrite(_) => "storage_write_failed",
      FeedbackError::StorageRead(_) => "storage_read_failed",
      FeedbackError::QueueUnavailable(_) => "queue_unavailable",
      FeedbackError::Notification(_) => "notification_failed",
      FeedbackError::Config(_) => "config_error",
      FeedbackError::Internal(_) => "internal_error",
    }
  }
}
