pub mod duplicates;
pub mod embeddings;
pub mod feedback_store;
pub mod jobs;
pub mod memory_store;
pub mod notifier;
pub mod queue;
pub mod similarity;
pub mod triage;

#[cfg(feature = "lancedb-store")]
pub mod lancedb;
