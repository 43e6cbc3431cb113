//! Embedding generation for feedback submissions
//!
//! Submissions are embedded through an OpenAI-compatible `/embeddings`
//! endpoint. The service is stateless; one HTTP client is built at start-up
//! and shared by every request.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::server::error::{FeedbackError, Result};
use crate::server::models::feedback::embedding_text;

/// Turns a submission's title and description into a vector
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Embedder: Send + Sync {
  async fn embed(&self, title: &str, description: &str) -> Result<Vec<f32>>;
}

/// Settings for the embeddings endpoint
#[derive(Debug, Clone)]
pub struct EmbeddingServiceConfig {
  /// Base URL, e.g. `https://api.openai.com/v1`
  pub base_url: String,
  pub api_key: String,
  pub model: String,
  /// Expected vector length; responses of any other length are rejected
  pub dimension: Option<usize>,
  pub timeout_secs: u64,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
  model: &'a str,
  input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
  data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
  embedding: Vec<f32>,
}

/// Embedder backed by an OpenAI-compatible HTTP API
pub struct OpenAiEmbedder {
  client: Client,
  config: EmbeddingServiceConfig,
}

impl OpenAiEmbedder {
  pub fn new(config: EmbeddingServiceConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| FeedbackError::Config(format!("Failed to create HTTP client: {e}")))?;

    Ok(Self { client, config })
  }

  fn endpoint(&self) -> String {
    format!("{}/embeddings", self.config.base_url.trim_end_matches('/'))
  }

  async fn request(&self, text: &str) -> Result<Vec<f32>> {
    let request = EmbeddingRequest { model: &self.config.model, input: text };

    debug!("Requesting embedding for {} chars with model {}", text.len(), self.config.model);

    let response = self
      .client
      .post(self.endpoint())
      .bearer_auth(&self.config.api_key)
      .json(&request)
      .send()
      .await
      .map_err(|e| FeedbackError::EmbeddingService(format!("Request failed: {e}")))?;

    if !response.status().is_success() {
      let status = response.status();
      let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
      return Err(FeedbackError::EmbeddingService(format!(
        "Embedding request failed with status {status}: {error_text}"
      )));
    }

    let body: EmbeddingResponse = response
      .json()
      .await
      .map_err(|e| FeedbackError::EmbeddingService(format!("Invalid response: {e}")))?;

    self.validate(body)
  }

  fn validate(&self, body: EmbeddingResponse) -> Result<Vec<f32>> {
    let embedding = body
      .data
      .into_iter()
      .next()
      .map(|data| data.embedding)
      .ok_or_else(|| FeedbackError::EmbeddingService("No embedding data returned".to_string()))?;

    if embedding.is_empty() {
      return Err(FeedbackError::EmbeddingService("Empty embedding returned".to_string()));
    }

    if let Some(expected) = self.config.dimension {
      if embedding.len() != expected {
        return Err(FeedbackError::EmbeddingService(format!(
          "Expected {expected} dimensions, got {}",
          embedding.len()
        )));
      }
    }

    debug!("Received embedding of dimension {}", embedding.len());
    Ok(embedding)
  }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
  async fn embed(&self, title: &str, description: &str) -> Result<Vec<f32>> {
    self.request(&embedding_text(title, description)).await
  }
}
