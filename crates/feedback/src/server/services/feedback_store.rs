//! Storage abstraction for the feedback collection
//!
//! The collection is read through [`SimilarityIndex`] by the duplicate
//! resolver and written through [`FeedbackStore`] by the triage pipeline.
//! Backends (LanceDB, in-memory) implement both over the same records.

use async_trait::async_trait;

use crate::server::error::Result;
use crate::server::models::feedback::{FeedbackSummary, NewFeedback, UpvoteStatus};

/// A nearest-neighbour candidate returned by a similarity query
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
  pub id: String,
  /// Cosine similarity, higher is more similar
  pub score: f32,
}

/// Nearest-neighbour queries over stored feedback embeddings
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
  /// Return up to `candidate_pool` candidates ordered by descending score.
  ///
  /// Ordering among equal scores is backend-defined.
  async fn nearest(&self, embedding: &[f32], candidate_pool: usize) -> Result<Vec<ScoredCandidate>>;
}

/// Mutations and listing over the feedback collection
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedbackStore: Send + Sync {
  /// Insert a new record with one upvote, returning its id
  async fn insert(&self, feedback: NewFeedback) -> Result<String>;

  /// Add exactly one upvote and refresh `updated_at`
  async fn upvote(&self, id: &str) -> Result<UpvoteStatus>;

  /// All records, oldest first, without embeddings
  async fn list(&self) -> Result<Vec<FeedbackSummary>>;
}
