//! Arrow conversion for feedback records

use arrow::array::{Array, ArrayRef, FixedSizeListBuilder, Float32Builder, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::server::error::{FeedbackError, Result};
use crate::server::models::feedback::{FeedbackRecord, FeedbackSummary};

pub const ID: &str = "id";
pub const EMAIL: &str = "email";
pub const NAME: &str = "name";
pub const TITLE: &str = "title";
pub const DESCRIPTION: &str = "description";
pub const EMBEDDING: &str = "embedding";
pub const UPVOTES: &str = "upvotes";
pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";

/// Every column except the embedding
pub const SUMMARY_COLUMNS: [&str; 8] = [ID, EMAIL, NAME, TITLE, DESCRIPTION, UPVOTES, CREATED_AT, UPDATED_AT];

/// Schema of the feedback table for a given embedding dimension
pub fn feedback_schema(dimension: usize) -> SchemaRef {
  Arc::new(Schema::new(vec![
    Field::new(ID, DataType::Utf8, false),
    Field::new(EMAIL, DataType::Utf8, false),
    Field::new(NAME, DataType::Utf8, false),
    Field::new(TITLE, DataType::Utf8, false),
    Field::new(DESCRIPTION, DataType::Utf8, false),
    Field::new(
      EMBEDDING,
      DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dimension as i32),
      false,
    ),
    Field::new(UPVOTES, DataType::Int64, false),
    // RFC 3339 strings sort chronologically
    Field::new(CREATED_AT, DataType::Utf8, false),
    Field::new(UPDATED_AT, DataType::Utf8, false),
  ]))
}

/// Embedding dimension declared by an existing table schema
pub fn embedding_dimension(schema: &Schema) -> Option<usize> {
  match schema.field_with_name(EMBEDDING).ok()?.data_type() {
    DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
    _ => None,
  }
}

/// Convert a single record into a one-row batch
pub fn record_to_batch(record: &FeedbackRecord, dimension: usize) -> Result<RecordBatch> {
  if record.embedding.len() != dimension {
    return Err(FeedbackError::StorageWrite(format!(
      "Embedding has {} dimensions, table uses {dimension}",
      record.embedding.len()
    )));
  }

  let mut embedding_builder = FixedSizeListBuilder::new(Float32Builder::with_capacity(dimension), dimension as i32);
  embedding_builder.values().append_slice(&record.embedding);
  embedding_builder.append(true);

  let columns: Vec<ArrayRef> = vec![
    Arc::new(StringArray::from(vec![record.id.as_str()])),
    Arc::new(StringArray::from(vec![record.email.as_str()])),
    Arc::new(StringArray::from(vec![record.name.as_str()])),
    Arc::new(StringArray::from(vec![record.title.as_str()])),
    Arc::new(StringArray::from(vec![record.description.as_str()])),
    Arc::new(embedding_builder.finish()),
    Arc::new(Int64Array::from(vec![record.upvotes as i64])),
    Arc::new(StringArray::from(vec![record.created_at.to_rfc3339()])),
    Arc::new(StringArray::from(vec![record.updated_at.to_rfc3339()])),
  ];

  RecordBatch::try_new(feedback_schema(dimension), columns)
    .map_err(|e| FeedbackError::StorageWrite(format!("Failed to create RecordBatch: {e}")))
}

/// Decode a batch selected with [`SUMMARY_COLUMNS`]
pub fn batch_to_summaries(batch: &RecordBatch) -> Result<Vec<FeedbackSummary>> {
  let ids = string_column(batch, ID)?;
  let emails = string_column(batch, EMAIL)?;
  let names = string_column(batch, NAME)?;
  let titles = string_column(batch, TITLE)?;
  let descriptions = string_column(batch, DESCRIPTION)?;
  let upvotes = upvotes_column(batch)?;
  let created = string_column(batch, CREATED_AT)?;
  let updated = string_column(batch, UPDATED_AT)?;

  (0..batch.num_rows())
    .map(|i| {
      Ok(FeedbackSummary {
        id: ids.value(i).to_string(),
        email: emails.value(i).to_string(),
        name: names.value(i).to_string(),
        title: titles.value(i).to_string(),
        description: descriptions.value(i).to_string(),
        upvotes: upvotes.value(i).max(0) as u64,
        created_at: parse_timestamp(created.value(i))?,
        updated_at: parse_timestamp(updated.value(i))?,
      })
    })
    .collect()
}

pub fn string_column<'a>(batch: &'a RecordBatch, column_name: &str) -> Result<&'a StringArray> {
  batch
    .column_by_name(column_name)
    .ok_or_else(|| FeedbackError::StorageRead(format!("Missing '{column_name}' column")))?
    .as_any()
    .downcast_ref::<StringArray>()
    .ok_or_else(|| FeedbackError::StorageRead(format!("Column '{column_name}' is not a string column")))
}

pub fn upvotes_column(batch: &RecordBatch) -> Result<&Int64Array> {
  batch
    .column_by_name(UPVOTES)
    .ok_or_else(|| FeedbackError::StorageRead(format!("Missing '{UPVOTES}' column")))?
    .as_any()
    .downcast_ref::<Int64Array>()
    .ok_or_else(|| FeedbackError::StorageRead(format!("Column '{UPVOTES}' is not an integer column")))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(value)
    .map(|t| t.with_timezone(&Utc))
    .map_err(|e| FeedbackError::StorageRead(format!("Invalid timestamp '{value}': {e}")))
}
