//! Near-duplicate detection for incoming feedback
//!
//! A submission is a duplicate when the best candidate the similarity index
//! returns scores at or above the configured threshold. Only the single best
//! candidate is considered; when several candidates tie, whichever the index
//! returned first wins.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::server::error::Result;
use crate::server::services::embeddings::Embedder;
use crate::server::services::feedback_store::{ScoredCandidate, SimilarityIndex};

pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.80;
pub const DEFAULT_CANDIDATE_POOL: usize = 100;

/// Threshold and search bound used to judge duplicates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPolicy {
  /// Inclusive similarity threshold
  pub threshold: f32,
  /// Maximum number of candidates requested from the index
  pub candidate_pool: usize,
}

impl Default for MatchPolicy {
  fn default() -> Self {
    Self { threshold: DEFAULT_SIMILARITY_THRESHOLD, candidate_pool: DEFAULT_CANDIDATE_POOL }
  }
}

/// Outcome of a duplicate check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCheck {
  pub found: bool,
  pub matched_id: Option<String>,
}

impl DuplicateCheck {
  pub fn new_topic() -> Self {
    Self { found: false, matched_id: None }
  }

  pub fn duplicate_of(id: impl Into<String>) -> Self {
    Self { found: true, matched_id: Some(id.into()) }
  }
}

/// A duplicate check together with the data used to reach it
#[derive(Debug, Clone)]
pub struct Resolution {
  pub check: DuplicateCheck,
  /// Score of the best candidate, if the index returned any
  pub best_score: Option<f32>,
  /// Embedding of the submission, reusable for an insert
  pub embedding: Vec<f32>,
}

pub struct DuplicateResolver {
  embedder: Arc<dyn Embedder>,
  index: Arc<dyn SimilarityIndex>,
  policy: MatchPolicy,
}

impl DuplicateResolver {
  pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn SimilarityIndex>, policy: MatchPolicy) -> Self {
    Self { embedder, index, policy }
  }

  pub fn policy(&self) -> MatchPolicy {
    self.policy
  }

  /// Decide whether a submission duplicates stored feedback
  pub async fn find_duplicate(&self, title: &str, description: &str) -> Result<DuplicateCheck> {
    Ok(self.resolve(title, description).await?.check)
  }

  /// Embed a submission and judge it against its nearest neighbours
  pub async fn resolve(&self, title: &str, description: &str) -> Result<Resolution> {
    let embedding = self.embedder.embed(title, description).await?;
    let candidates = self.index.nearest(&embedding, self.policy.candidate_pool).await?;

    let best_score = candidates.first().map(|candidate| candidate.score);
    debug!("Best duplicate candidate score for '{title}': {best_score:?}");

    Ok(Resolution { check: judge(&candidates, &self.policy), best_score, embedding })
  }
}

/// Apply the match policy to candidates ordered by descending score
pub fn judge(candidates: &[ScoredCandidate], policy: &MatchPolicy) -> DuplicateCheck {
  match candidates.first() {
    Some(top) if top.score >= policy.threshold => DuplicateCheck::duplicate_of(top.id.clone()),
    _ => DuplicateCheck::new_topic(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::server::error::FeedbackError;
  use crate::server::services::embeddings::MockEmbedder;
  use crate::server::services::feedback_store::MockSimilarityIndex;
  use mockall::predicate::*;

  fn candidate(id: &str, score: f32) -> ScoredCandidate {
    ScoredCandidate { id: id.to_string(), score }
  }

  fn embedder_returning(embedding: Vec<f32>) -> MockEmbedder {
    let mut embedder = MockEmbedder::new();
    embedder.expect_embed().times(1).returning(move |_, _| Ok(embedding.clone()));
    embedder
  }

  #[test]
  fn test_judge_no_candidates() {
    assert_eq!(judge(&[], &MatchPolicy::default()), DuplicateCheck::new_topic());
  }

  #[test]
  fn test_judge_threshold_is_inclusive() {
    let check = judge(&[candidate("a", 0.80)], &MatchPolicy::default());
    assert_eq!(check, DuplicateCheck::duplicate_of("a"));
  }

  #[test]
  fn test_judge_below_threshold() {
    let check = judge(&[candidate("a", 0.7999)], &MatchPolicy::default());
    assert_eq!(check, DuplicateCheck::new_topic());
  }

  #[test]
  fn test_judge_only_considers_first_candidate() {
    // An index returning a weaker candidate first is taken at its word
    let candidates = vec![candidate("weak", 0.5), candidate("strong", 0.95)];
    assert_eq!(judge(&candidates, &MatchPolicy::default()), DuplicateCheck::new_topic());
  }

  #[test]
  fn test_judge_custom_threshold() {
    let policy = MatchPolicy { threshold: 0.9, candidate_pool: 10 };
    assert_eq!(judge(&[candidate("a", 0.85)], &policy), DuplicateCheck::new_topic());
    assert_eq!(judge(&[candidate("a", 0.9)], &policy), DuplicateCheck::duplicate_of("a"));
  }

  #[tokio::test]
  async fn test_find_duplicate_queries_index_with_embedding_and_pool() {
    let embedder = embedder_returning(vec![0.6, 0.8]);

    let mut index = MockSimilarityIndex::new();
    index
      .expect_nearest()
      .withf(|embedding, pool| embedding.to_vec() == vec![0.6, 0.8] && *pool == 100)
      .times(1)
      .returning(|_, _| Ok(vec![ScoredCandidate { id: "existing".to_string(), score: 0.93 }]));

    let resolver = DuplicateResolver::new(Arc::new(embedder), Arc::new(index), MatchPolicy::default());
    let check = resolver.find_duplicate("Add dark theme", "A dark mode option would be great").await.unwrap();

    assert_eq!(check, DuplicateCheck::duplicate_of("existing"));
  }

  #[tokio::test]
  async fn test_resolve_keeps_embedding_and_score() {
    let embedder = embedder_returning(vec![1.0, 0.0]);

    let mut index = MockSimilarityIndex::new();
    index
      .expect_nearest()
      .times(1)
      .returning(|_, _| Ok(vec![ScoredCandidate { id: "other".to_string(), score: 0.2 }]));

    let resolver = DuplicateResolver::new(Arc::new(embedder), Arc::new(index), MatchPolicy::default());
    let resolution = resolver.resolve("Export to PDF fails", "Clicking export crashes").await.unwrap();

    assert_eq!(resolution.check, DuplicateCheck::new_topic());
    assert_eq!(resolution.best_score, Some(0.2));
    assert_eq!(resolution.embedding, vec![1.0, 0.0]);
  }

  #[tokio::test]
  async fn test_embedding_failure_skips_index() {
    let mut embedder = MockEmbedder::new();
    embedder
      .expect_embed()
      .with(eq("title"), eq("description"))
      .times(1)
      .returning(|_, _| Err(FeedbackError::EmbeddingService("unauthorized".to_string())));

    let mut index = MockSimilarityIndex::new();
    index.expect_nearest().times(0);

    let resolver = DuplicateResolver::new(Arc::new(embedder), Arc::new(index), MatchPolicy::default());
    let err = resolver.find_duplicate("title", "description").await.unwrap_err();

    assert!(matches!(err, FeedbackError::EmbeddingService(_)));
  }

  #[tokio::test]
  async fn test_index_failure_propagates() {
    let embedder = embedder_returning(vec![1.0]);

    let mut index = MockSimilarityIndex::new();
    index
      .expect_nearest()
      .returning(|_, _| Err(FeedbackError::IndexQuery("table missing".to_string())));

    let resolver = DuplicateResolver::new(Arc::new(embedder), Arc::new(index), MatchPolicy::default());
    let err = resolver.find_duplicate("title", "description").await.unwrap_err();

    assert!(matches!(err, FeedbackError::IndexQuery(_)));
  }
}
