//! Table management operations for LanceDB

use arrow::record_batch::{RecordBatch, RecordBatchIterator};
use futures::stream::StreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{Connection, Table};
use tracing::info;

use super::records::{self, UPDATED_AT, UPVOTES};
use crate::server::error::{FeedbackError, Result};
use crate::server::models::feedback::{FeedbackRecord, FeedbackSummary};

/// Owns the feedback table of one LanceDB database
pub struct TableManager {
  table: Table,
  dimension: usize,
}

impl TableManager {
  /// Open the table, creating it empty when it does not exist yet
  pub async fn open_or_create(connection: &Connection, table_name: &str, dimension: usize) -> Result<Self> {
    let tables = connection
      .table_names()
      .execute()
      .await
      .map_err(|e| FeedbackError::StorageRead(format!("Failed to list tables: {e}")))?;

    let table = if tables.iter().any(|name| name == table_name) {
      let table = connection
        .open_table(table_name)
        .execute()
        .await
        .map_err(|e| FeedbackError::StorageRead(format!("Failed to open table '{table_name}': {e}")))?;
      check_dimension(&table, table_name, dimension).await?;
      table
    } else {
      let table = connection
        .create_empty_table(table_name, records::feedback_schema(dimension))
        .execute()
        .await
        .map_err(|e| FeedbackError::StorageWrite(format!("Failed to create table '{table_name}': {e}")))?;
      info!("Created table '{table_name}' for {dimension}-dimensional embeddings");
      table
    };

    Ok(Self { table, dimension })
  }

  pub fn table(&self) -> &Table {
    &self.table
  }

  pub async fn count_rows(&self, filter: Option<String>) -> Result<usize> {
    self
      .table
      .count_rows(filter)
      .await
      .map_err(|e| FeedbackError::StorageRead(format!("Failed to count rows: {e}")))
  }

  pub async fn add_record(&self, record: &FeedbackRecord) -> Result<()> {
    let batch = records::record_to_batch(record, self.dimension)?;
    let schema = batch.schema();
    let batch_iter = RecordBatchIterator::new(vec![Ok(batch)], schema);

    self
      .table
      .add(batch_iter)
      .execute()
      .await
      .map_err(|e| FeedbackError::StorageWrite(format!("Failed to store feedback: {e}")))?;

    Ok(())
  }

  /// Add one upvote to every row matching `filter` and stamp `updated_at`
  pub async fn increment_upvotes(&self, filter: &str, updated_at: &str) -> Result<()> {
    self
      .table
      .update()
      .only_if(filter)
      .column(UPVOTES, format!("{UPVOTES} + 1"))
      .column(UPDATED_AT, format!("'{updated_at}'"))
      .execute()
      .await
      .map_err(|e| FeedbackError::StorageWrite(format!("Failed to upvote: {e}")))?;

    Ok(())
  }

  /// Current upvote count of the first row matching `filter`
  pub async fn read_upvotes(&self, filter: &str) -> Result<Option<u64>> {
    let batches = self
      .collect(
        self
          .table
          .query()
          .only_if(filter)
          .select(Select::Columns(vec![UPVOTES.to_string()]))
          .limit(1),
      )
      .await?;

    for batch in &batches {
      let upvotes = records::upvotes_column(batch)?;
      if upvotes.len() > 0 {
        return Ok(Some(upvotes.value(0).max(0) as u64));
      }
    }
    Ok(None)
  }

  /// Every row without its embedding
  pub async fn scan_summaries(&self) -> Result<Vec<FeedbackSummary>> {
    let total = self.count_rows(None).await?;
    if total == 0 {
      return Ok(Vec::new());
    }

    let columns = records::SUMMARY_COLUMNS.iter().map(|c| c.to_string()).collect();
    let batches = self.collect(self.table.query().select(Select::Columns(columns)).limit(total)).await?;

    let mut summaries = Vec::with_capacity(total);
    for batch in &batches {
      summaries.extend(records::batch_to_summaries(batch)?);
    }
    Ok(summaries)
  }

  async fn collect(&self, query: impl ExecutableQuery) -> Result<Vec<RecordBatch>> {
    let mut stream = query
      .execute()
      .await
      .map_err(|e| FeedbackError::StorageRead(format!("Query failed: {e}")))?;

    let mut batches = Vec::new();
    while let Some(batch) = stream.next().await {
      batches.push(batch.map_err(|e| FeedbackError::StorageRead(format!("Error reading batch: {e}")))?);
    }
    Ok(batches)
  }
}

async fn check_dimension(table: &Table, table_name: &str, dimension: usize) -> Result<()> {
  let schema = table
    .schema()
    .await
    .map_err(|e| FeedbackError::StorageRead(format!("Failed to read schema of '{table_name}': {e}")))?;

  match records::embedding_dimension(&schema) {
    Some(existing) if existing == dimension => Ok(()),
    Some(existing) => Err(FeedbackError::Config(format!(
      "Table '{table_name}' stores {existing}-dimensional embeddings but {dimension} are configured"
    ))),
    None => Err(FeedbackError::Config(format!("Table '{table_name}' has no embedding column"))),
  }
}
