//! LanceDB-backed feedback collection
//!
//! Records live in a single LanceDB table whose `embedding` column is
//! searched with exact cosine distance. All mutations go through the triage
//! worker, so an upvote is a filtered update followed by a read-back without
//! further locking.

pub mod connection;
pub mod records;
pub mod search;
pub mod table_manager;

use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use crate::server::error::{FeedbackError, Result};
use crate::server::models::feedback::{FeedbackRecord, FeedbackSummary, NewFeedback, UpvoteStatus};
use crate::server::services::feedback_store::{FeedbackStore, ScoredCandidate, SimilarityIndex};
use connection::create_connection;
use table_manager::TableManager;

pub struct LanceDbFeedbackStore {
  table_manager: TableManager,
}

impl LanceDbFeedbackStore {
  /// Open (or create) the feedback table in the database at `data_dir`
  pub async fn open(data_dir: &Path, table_name: &str, dimension: usize) -> Result<Self> {
    let connection = create_connection(data_dir).await?;
    let table_manager = TableManager::open_or_create(&connection, table_name, dimension).await?;
    info!("Opened LanceDB feedback table '{table_name}' at {}", data_dir.display());
    Ok(Self { table_manager })
  }
}

/// Filter selecting one record; ids are validated as UUIDs before being embedded
fn id_filter(id: &str) -> Option<String> {
  Uuid::parse_str(id).ok().map(|uuid| format!("{} = '{uuid}'", records::ID))
}

fn as_index_failure(error: FeedbackError) -> FeedbackError {
  match error {
    FeedbackError::IndexQuery(_) => error,
    other => FeedbackError::IndexQuery(other.to_string()),
  }
}

#[async_trait]
impl SimilarityIndex for LanceDbFeedbackStore {
  async fn nearest(&self, embedding: &[f32], candidate_pool: usize) -> Result<Vec<ScoredCandidate>> {
    if candidate_pool == 0 {
      return Ok(Vec::new());
    }

    // Reading the table for a search is part of the index query
    let rows = self.table_manager.count_rows(None).await.map_err(as_index_failure)?;
    if rows == 0 {
      return Ok(Vec::new());
    }
    search::search_nearest(self.table_manager.table(), embedding, candidate_pool).await
  }
}

#[async_trait]
impl FeedbackStore for LanceDbFeedbackStore {
  async fn insert(&self, feedback: NewFeedback) -> Result<String> {
    let record = FeedbackRecord::create(feedback);
    self.table_manager.add_record(&record).await?;
    Ok(record.id)
  }

  async fn upvote(&self, id: &str) -> Result<UpvoteStatus> {
    let filter = id_filter(id).ok_or_else(|| FeedbackError::NotFound(id.to_string()))?;

    if self.table_manager.count_rows(Some(filter.clone())).await? == 0 {
      return Err(FeedbackError::NotFound(id.to_string()));
    }

    self.table_manager.increment_upvotes(&filter, &Utc::now().to_rfc3339()).await?;

    let upvotes = self
      .table_manager
      .read_upvotes(&filter)
      .await?
      .ok_or_else(|| FeedbackError::NotFound(id.to_string()))?;

    Ok(UpvoteStatus { id: id.to_string(), upvotes })
  }

  async fn list(&self) -> Result<Vec<FeedbackSummary>> {
    let mut summaries = self.table_manager.scan_summaries().await?;
    summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(summaries)
  }
}
