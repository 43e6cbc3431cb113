//! Bounded history of triage job outcomes
//!
//! Background triage never reports back to the submitter's HTTP request, so
//! every finished job is recorded here and served from `GET /jobs`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::server::services::triage::TriageOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
  Succeeded,
  Failed,
}

impl JobStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      JobStatus::Succeeded => "succeeded",
      JobStatus::Failed => "failed",
    }
  }
}

/// A finished triage job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
  pub job_id: Uuid,
  pub status: JobStatus,
  pub feedback_title: String,
  pub attempts: u32,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub outcome: Option<TriageOutcome>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notification_error: Option<String>,
  pub enqueued_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
}

struct JobLogInner {
  entries: VecDeque<JobRecord>,
  max_entries: usize,
}

/// Thread-safe in-memory job history; the oldest entries are evicted first
#[derive(Clone)]
pub struct JobLog {
  inner: Arc<Mutex<JobLogInner>>,
}

impl JobLog {
  pub fn new(max_entries: usize) -> Self {
    let max_entries = max_entries.max(1);
    Self {
      inner: Arc::new(Mutex::new(JobLogInner {
        entries: VecDeque::with_capacity(max_entries),
        max_entries,
      })),
    }
  }

  pub async fn record(&self, record: JobRecord) {
    let mut guard = self.inner.lock().await;
    if guard.entries.len() >= guard.max_entries {
      guard.entries.pop_front();
    }
    guard.entries.push_back(record);
  }

  /// Newest first, optionally filtered by status ("succeeded", "failed" or "all")
  pub async fn recent(&self, limit: Option<usize>, status_filter: Option<&str>) -> Vec<JobRecord> {
    let guard = self.inner.lock().await;

    let mut records: Vec<JobRecord> = guard
      .entries
      .iter()
      .rev()
      .filter(|record| status_filter.is_none_or(|filter| filter == "all" || record.status.as_str() == filter))
      .cloned()
      .collect();

    if let Some(limit) = limit {
      records.truncate(limit);
    }

    records
  }

  pub async fn len(&self) -> usize {
    self.inner.lock().await.entries.len()
  }

  pub async fn is_empty(&self) -> bool {
    self.inner.lock().await.entries.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record(title: &str, status: JobStatus) -> JobRecord {
    JobRecord {
      job_id: Uuid::new_v4(),
      status,
      feedback_title: title.to_string(),
      attempts: 1,
      outcome: None,
      error: None,
      notification_error: None,
      enqueued_at: Utc::now(),
      finished_at: Utc::now(),
    }
  }

  #[tokio::test]
  async fn test_recent_is_newest_first() {
    let log = JobLog::new(10);
    log.record(record("first", JobStatus::Succeeded)).await;
    log.record(record("second", JobStatus::Succeeded)).await;

    let recent = log.recent(None, None).await;
    assert_eq!(recent[0].feedback_title, "second");
    assert_eq!(recent[1].feedback_title, "first");
  }

  #[tokio::test]
  async fn test_capacity_evicts_oldest() {
    let log = JobLog::new(2);
    log.record(record("one", JobStatus::Succeeded)).await;
    log.record(record("two", JobStatus::Succeeded)).await;
    log.record(record("three", JobStatus::Failed)).await;

    assert_eq!(log.len().await, 2);
    let titles: Vec<_> = log.recent(None, None).await.into_iter().map(|r| r.feedback_title).collect();
    assert_eq!(titles, vec!["three", "two"]);
  }

  #[tokio::test]
  async fn test_status_filter_and_limit() {
    let log = JobLog::new(10);
    log.record(record("ok", JobStatus::Succeeded)).await;
    log.record(record("bad-1", JobStatus::Failed)).await;
    log.record(record("bad-2", JobStatus::Failed)).await;

    let failed = log.recent(None, Some("failed")).await;
    assert_eq!(failed.len(), 2);
    assert!(failed.iter().all(|r| r.status == JobStatus::Failed));

    assert_eq!(log.recent(Some(1), Some("all")).await.len(), 1);
    assert_eq!(log.recent(None, Some("succeeded")).await[0].feedback_title, "ok");
  }

  #[test]
  fn test_record_serialization_skips_empty_fields() {
    let json = serde_json::to_value(record("ok", JobStatus::Succeeded)).unwrap();
    assert_eq!(json["status"], "succeeded");
    assert!(json.get("error").is_none());
  }
}
