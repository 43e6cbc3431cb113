//! Database connection management for LanceDB

use lancedb::{connect, Connection};
use std::path::Path;

use crate::server::error::{FeedbackError, Result};

/// Open a LanceDB database, creating its directory if needed
pub async fn create_connection(data_dir: &Path) -> Result<Connection> {
  ensure_data_directory_exists(data_dir)?;

  connect(&data_dir.to_string_lossy())
    .execute()
    .await
    .map_err(|e| FeedbackError::Config(format!("Failed to connect to LanceDB at {}: {e}", data_dir.display())))
}

fn ensure_data_directory_exists(data_dir: &Path) -> Result<()> {
  if !data_dir.exists() {
    std::fs::create_dir_all(data_dir)
      .map_err(|e| FeedbackError::Config(format!("Failed to create data directory: {e}")))?;
  }
  Ok(())
}
