//! In-process feedback collection with exact cosine search

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::server::error::{FeedbackError, Result};
use crate::server::models::feedback::{FeedbackRecord, FeedbackSummary, NewFeedback, UpvoteStatus};
use crate::server::services::feedback_store::{FeedbackStore, ScoredCandidate, SimilarityIndex};
use crate::server::services::similarity::cosine_similarity;

/// Feedback collection held in memory
///
/// Similarity queries scan every record. Records are kept in insertion
/// order, which is also the tie-break among equal scores.
#[derive(Default)]
pub struct InMemoryFeedbackStore {
  records: RwLock<Vec<FeedbackRecord>>,
}

impl InMemoryFeedbackStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub async fn len(&self) -> usize {
    self.records.read().await.len()
  }

  pub async fn is_empty(&self) -> bool {
    self.records.read().await.is_empty()
  }
}

#[async_trait]
impl SimilarityIndex for InMemoryFeedbackStore {
  async fn nearest(&self, embedding: &[f32], candidate_pool: usize) -> Result<Vec<ScoredCandidate>> {
    let records = self.records.read().await;

    let mut candidates: Vec<ScoredCandidate> = records
      .iter()
      .map(|record| ScoredCandidate {
        id: record.id.clone(),
        score: cosine_similarity(embedding, &record.embedding),
      })
      .collect();

    // Stable sort keeps insertion order among ties
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    candidates.truncate(candidate_pool);

    Ok(candidates)
  }
}

#[async_trait]
impl FeedbackStore for InMemoryFeedbackStore {
  async fn insert(&self, feedback: NewFeedback) -> Result<String> {
    let mut records = self.records.write().await;

    if let Some(existing) = records.first() {
      if existing.embedding.len() != feedback.embedding.len() {
        return Err(FeedbackError::StorageWrite(format!(
          "Embedding has {} dimensions, collection uses {}",
          feedback.embedding.len(),
          existing.embedding.len()
        )));
      }
    }

    let record = FeedbackRecord::create(feedback);
    let id = record.id.clone();
    records.push(record);
    Ok(id)
  }

  async fn upvote(&self, id: &str) -> Result<UpvoteStatus> {
    let mut records = self.records.write().await;

    let record = records
      .iter_mut()
      .find(|record| record.id == id)
      .ok_or_else(|| FeedbackError::NotFound(id.to_string()))?;

    record.upvotes += 1;
    record.updated_at = Utc::now();

    Ok(UpvoteStatus { id: record.id.clone(), upvotes: record.upvotes })
  }

  async fn list(&self) -> Result<Vec<FeedbackSummary>> {
    let records = self.records.read().await;
    Ok(records.iter().map(FeedbackRecord::summary).collect())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn new_feedback(title: &str, embedding: Vec<f32>) -> NewFeedback {
    NewFeedback {
      email: "sam@example.com".to_string(),
      name: "Sam".to_string(),
      title: title.to_string(),
      description: format!("{title} description"),
      embedding,
    }
  }

  #[tokio::test]
  async fn test_insert_then_upvote_counts() {
    let store = InMemoryFeedbackStore::new();
    let id = store.insert(new_feedback("Dark mode", vec![1.0, 0.0])).await.unwrap();

    let listed = store.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].upvotes, 1);

    for expected in 2..=4 {
      let status = store.upvote(&id).await.unwrap();
      assert_eq!(status.upvotes, expected);
    }

    let listed = store.list().await.unwrap();
    assert_eq!(listed[0].upvotes, 4);
    assert!(listed[0].updated_at >= listed[0].created_at);
  }

  #[tokio::test]
  async fn test_upvote_unknown_id_leaves_store_unchanged() {
    let store = InMemoryFeedbackStore::new();
    store.insert(new_feedback("Dark mode", vec![1.0, 0.0])).await.unwrap();
    let before = store.list().await.unwrap();

    let err = store.upvote("missing").await.unwrap_err();

    assert!(matches!(err, FeedbackError::NotFound(_)));
    assert_eq!(store.list().await.unwrap(), before);
  }

  #[tokio::test]
  async fn test_nearest_orders_by_score_and_truncates() {
    let store = InMemoryFeedbackStore::new();
    let far = store.insert(new_feedback("Far", vec![0.0, 1.0])).await.unwrap();
    let near = store.insert(new_feedback("Near", vec![1.0, 0.1])).await.unwrap();

    let candidates = store.nearest(&[1.0, 0.0], 10).await.unwrap();
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].id, near);
    assert_eq!(candidates[1].id, far);
    assert!(candidates[0].score > candidates[1].score);

    let top = store.nearest(&[1.0, 0.0], 1).await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].id, near);
  }

  #[tokio::test]
  async fn test_nearest_ties_keep_insertion_order() {
    let store = InMemoryFeedbackStore::new();
    let first = store.insert(new_feedback("First", vec![1.0, 0.0])).await.unwrap();
    store.insert(new_feedback("Second", vec![1.0, 0.0])).await.unwrap();

    let candidates = store.nearest(&[1.0, 0.0], 5).await.unwrap();
    assert_eq!(candidates[0].id, first);
  }

  #[tokio::test]
  async fn test_nearest_on_empty_store() {
    let store = InMemoryFeedbackStore::new();
    assert!(store.nearest(&[1.0, 0.0], 100).await.unwrap().is_empty());
    assert!(store.is_empty().await);
  }

  #[tokio::test]
  async fn test_insert_rejects_dimension_change() {
    let store = InMemoryFeedbackStore::new();
    store.insert(new_feedback("Two dims", vec![1.0, 0.0])).await.unwrap();

    let err = store.insert(new_feedback("Three dims", vec![1.0, 0.0, 0.0])).await.unwrap_err();
    assert!(matches!(err, FeedbackError::StorageWrite(_)));
    assert_eq!(store.len().await, 1);
  }
}
