//! Nearest-neighbour queries against the feedback table

use arrow::array::{Array, Float32Array};
use arrow::record_batch::RecordBatch;
use futures::stream::StreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{DistanceType, Table};
use tracing::debug;

use super::records::{string_column, EMBEDDING, ID};
use crate::server::error::{FeedbackError, Result};
use crate::server::services::feedback_store::ScoredCandidate;
use crate::server::services::similarity::cosine_distance_to_similarity;

const DISTANCE_COLUMN: &str = "_distance";

/// Exact cosine search returning up to `limit` candidates, best first
pub async fn search_nearest(table: &Table, embedding: &[f32], limit: usize) -> Result<Vec<ScoredCandidate>> {
  let mut stream = table
    .vector_search(embedding)
    .map_err(|e| FeedbackError::IndexQuery(format!("Invalid query vector: {e}")))?
    .column(EMBEDDING)
    .distance_type(DistanceType::Cosine)
    .limit(limit)
    .select(Select::Columns(vec![ID.to_string()]))
    .execute()
    .await
    .map_err(|e| FeedbackError::IndexQuery(format!("Vector search failed: {e}")))?;

  let mut candidates = Vec::new();
  while let Some(batch) = stream.next().await {
    let batch = batch.map_err(|e| FeedbackError::IndexQuery(format!("Error reading batch: {e}")))?;
    candidates.extend(candidates_from_batch(&batch)?);
  }

  // Batches are not guaranteed to arrive in rank order
  candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

  if candidates.is_empty() {
    debug!("No similar feedback found");
  }
  Ok(candidates)
}

fn candidates_from_batch(batch: &RecordBatch) -> Result<Vec<ScoredCandidate>> {
  let ids = string_column(batch, ID).map_err(|e| FeedbackError::IndexQuery(e.to_string()))?;
  let distances = batch
    .column_by_name(DISTANCE_COLUMN)
    .and_then(|col| col.as_any().downcast_ref::<Float32Array>())
    .ok_or_else(|| FeedbackError::IndexQuery("Search result has no distance column".to_string()))?;

  Ok(
    (0..batch.num_rows())
      .filter(|&i| !distances.is_null(i))
      .map(|i| ScoredCandidate {
        id: ids.value(i).to_string(),
        score: cosine_distance_to_similarity(distances.value(i)),
      })
      .collect(),
  )
}
