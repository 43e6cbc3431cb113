//! Shared helpers for the HTTP and triage integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
  body::{to_bytes, Body},
  http::{Request, StatusCode},
  Router,
};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tower::ServiceExt;

use feedback::server::error::{FeedbackError, Result};
use feedback::server::models::feedback::embedding_text;
use feedback::server::services::embeddings::Embedder;
use feedback::server::services::jobs::JobLog;
use feedback::server::services::notifier::Notifier;
use feedback::server::services::triage::TriageOutcome;
use feedback::server::types::FeedbackSubmission;

/// Topics the keyword embedder recognises, one vector axis each
const TOPICS: [&[&str]; 3] = [&["dark", "theme", "night"], &["pdf", "export"], &["login", "password"]];

/// Deterministic embedder: texts about the same topic get identical vectors
pub struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
  async fn embed(&self, title: &str, description: &str) -> Result<Vec<f32>> {
    let text = embedding_text(title, description).to_lowercase();
    let mut vector: Vec<f32> = TOPICS
      .iter()
      .map(|words| words.iter().filter(|word| text.contains(*word)).count() as f32)
      .collect();
    // Keeps off-topic texts from producing a zero vector
    vector.push(0.1);
    Ok(vector)
  }
}

/// Notifier that remembers who it acknowledged
#[derive(Default)]
pub struct RecordingNotifier {
  pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
  async fn acknowledge(&self, submission: &FeedbackSubmission, outcome: &TriageOutcome) -> Result<()> {
    self.sent.lock().await.push((submission.customer_email.clone(), outcome.action().to_string()));
    Ok(())
  }
}

/// Notifier whose mail provider is always down
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
  async fn acknowledge(&self, _submission: &FeedbackSubmission, _outcome: &TriageOutcome) -> Result<()> {
    Err(FeedbackError::Notification("provider unavailable".to_string()))
  }
}

pub fn submission(email: &str, title: &str, description: &str) -> FeedbackSubmission {
  FeedbackSubmission {
    customer_email: email.to_string(),
    customer_name: "Test Customer".to_string(),
    feedback_title: title.to_string(),
    feedback_description: description.to_string(),
  }
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
  let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
  send(app, request).await
}

pub async fn post_json(app: &Router, uri: &str, body: &Value) -> (StatusCode, Value) {
  post_raw(app, uri, &body.to_string()).await
}

pub async fn post_raw(app: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
  let request = Request::builder()
    .method("POST")
    .uri(uri)
    .header("content-type", "application/json")
    .body(Body::from(body.to_string()))
    .unwrap();
  send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
  let response = app.clone().oneshot(request).await.unwrap();
  let status = response.status();
  let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
  let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
  (status, body)
}

/// Wait until the job log holds `count` finished jobs
pub async fn wait_for_jobs(jobs: &JobLog, count: usize) {
  for _ in 0..500 {
    if jobs.len().await >= count {
      return;
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
  }
  panic!("timed out waiting for {count} triage jobs, saw {}", jobs.len().await);
}
