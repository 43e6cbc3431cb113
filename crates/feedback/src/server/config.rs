//! Server configuration from command-line flags and environment
//!
//! Every flag falls back to an environment variable; `.env` files are loaded
//! by the binary before parsing.

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::server::error::{FeedbackError, Result};
use crate::server::services::duplicates::{MatchPolicy, DEFAULT_CANDIDATE_POOL, DEFAULT_SIMILARITY_THRESHOLD};
use crate::server::services::embeddings::EmbeddingServiceConfig;
use crate::server::services::notifier::{ResendConfig, RESEND_API_URL};
use crate::server::services::queue::RetryPolicy;

/// Where feedback records are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
  /// Persistent LanceDB table
  Lancedb,
  /// Process memory, lost on restart
  Memory,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "feedback_server")]
#[command(about = "Customer feedback intake with duplicate detection")]
#[command(version)]
pub struct ServerConfig {
  /// Server bind address
  #[arg(long, env = "FEEDBACK_BIND", default_value = "127.0.0.1:8000")]
  pub bind: SocketAddr,

  /// Storage backend for feedback records
  #[arg(long, env = "FEEDBACK_STORE", value_enum, default_value_t = StoreBackend::Lancedb)]
  pub store: StoreBackend,

  /// LanceDB database directory
  #[arg(long, env = "FEEDBACK_DATA_DIR", default_value = "./data/feedback.lancedb")]
  pub data_dir: PathBuf,

  /// Table holding feedback records
  #[arg(long, env = "FEEDBACK_COLLECTION", default_value = "feedback")]
  pub collection: String,

  /// API key for the embeddings endpoint
  #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
  pub openai_api_key: Option<String>,

  /// Base URL of the OpenAI-compatible API
  #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
  pub openai_base_url: String,

  /// Embedding model name
  #[arg(long, env = "OPENAI_EMBEDDING_MODEL", default_value = "text-embedding-3-small")]
  pub embedding_model: String,

  /// Length of the vectors the embedding model produces
  #[arg(long, env = "FEEDBACK_EMBEDDING_DIMENSION", default_value_t = 1536)]
  pub embedding_dimension: usize,

  /// Minimum cosine similarity for a submission to count as a duplicate
  #[arg(long, env = "FEEDBACK_SIMILARITY_THRESHOLD", default_value_t = DEFAULT_SIMILARITY_THRESHOLD)]
  pub similarity_threshold: f32,

  /// Maximum number of nearest neighbours examined per submission
  #[arg(long, env = "FEEDBACK_CANDIDATE_POOL", default_value_t = DEFAULT_CANDIDATE_POOL)]
  pub candidate_pool: usize,

  /// Pending submissions accepted before intake answers 503
  #[arg(long, env = "FEEDBACK_QUEUE_CAPACITY", default_value_t = 256)]
  pub queue_capacity: usize,

  /// Attempts per triage job for retryable failures
  #[arg(long, env = "FEEDBACK_MAX_ATTEMPTS", default_value_t = 3)]
  pub max_attempts: u32,

  /// Base delay between attempts, in milliseconds
  #[arg(long, env = "FEEDBACK_RETRY_DELAY_MS", default_value_t = 500)]
  pub retry_delay_ms: u64,

  /// Finished jobs kept for GET /jobs
  #[arg(long, env = "FEEDBACK_JOB_HISTORY", default_value_t = 500)]
  pub job_history: usize,

  /// Timeout for outbound HTTP calls, in seconds
  #[arg(long, env = "FEEDBACK_HTTP_TIMEOUT_SECS", default_value_t = 30)]
  pub http_timeout_secs: u64,

  /// Resend API key; acknowledgements are only logged without it
  #[arg(long, env = "RESEND_API_KEY", hide_env_values = true)]
  pub resend_api_key: Option<String>,

  /// Base URL of the Resend API
  #[arg(long, env = "RESEND_BASE_URL", default_value = RESEND_API_URL)]
  pub resend_base_url: String,

  /// Sender address for acknowledgement emails
  #[arg(long, env = "SENDER_EMAIL_ADDRESS", default_value = "support@example.com")]
  pub sender_email: String,

  /// Enable verbose logging
  #[arg(short, long, env = "FEEDBACK_VERBOSE")]
  pub verbose: bool,
}

impl ServerConfig {
  /// Reject settings the server cannot run with
  pub fn validate(&self) -> Result<()> {
    if !(0.0..=1.0).contains(&self.similarity_threshold) {
      return Err(FeedbackError::Config(format!(
        "similarity threshold must be within 0.0..=1.0, got {}",
        self.similarity_threshold
      )));
    }

    let positive = [
      ("candidate pool", self.candidate_pool),
      ("embedding dimension", self.embedding_dimension),
      ("queue capacity", self.queue_capacity),
      ("job history", self.job_history),
      ("max attempts", self.max_attempts as usize),
    ];
    if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
      return Err(FeedbackError::Config(format!("{name} must be greater than zero")));
    }

    if self.openai_api_key.as_deref().is_none_or(|key| key.trim().is_empty()) {
      return Err(FeedbackError::Config("OPENAI_API_KEY is required for embeddings".to_string()));
    }

    if self.collection.trim().is_empty() {
      return Err(FeedbackError::Config("collection name must not be empty".to_string()));
    }

    Ok(())
  }

  pub fn match_policy(&self) -> MatchPolicy {
    MatchPolicy { threshold: self.similarity_threshold, candidate_pool: self.candidate_pool }
  }

  pub fn retry_policy(&self) -> RetryPolicy {
    RetryPolicy { max_attempts: self.max_attempts, delay: Duration::from_millis(self.retry_delay_ms) }
  }

  pub fn embedding_config(&self) -> EmbeddingServiceConfig {
    EmbeddingServiceConfig {
      base_url: self.openai_base_url.clone(),
      api_key: self.openai_api_key.clone().unwrap_or_default(),
      model: self.embedding_model.clone(),
      dimension: Some(self.embedding_dimension),
      timeout_secs: self.http_timeout_secs,
    }
  }

  /// Email settings, present only when a Resend key is configured
  pub fn resend_config(&self) -> Option<ResendConfig> {
    self.resend_api_key.as_ref().filter(|key| !key.trim().is_empty()).map(|key| ResendConfig {
      base_url: self.resend_base_url.clone(),
      api_key: key.clone(),
      sender: self.sender_email.clone(),
      timeout_secs: self.http_timeout_secs,
    })
  }
}
