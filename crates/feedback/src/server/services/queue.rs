//! Triage job queue
//!
//! Intake handlers push submissions onto a bounded channel and return. A
//! single worker drains the channel, so every write to the feedback
//! collection happens in one task and the duplicate check of a job always
//! sees the writes of the jobs before it.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::server::error::{FeedbackError, Result};
use crate::server::services::jobs::{JobLog, JobRecord, JobStatus};
use crate::server::services::triage::{Triage, TriageReport};
use crate::server::types::FeedbackSubmission;

/// A submission waiting for triage
#[derive(Debug, Clone)]
pub struct TriageJob {
  pub id: Uuid,
  pub submission: FeedbackSubmission,
  pub enqueued_at: DateTime<Utc>,
}

/// How often and how patiently retryable failures are attempted again
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  /// Base delay, multiplied by the attempt number
  pub delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self { max_attempts: 3, delay: Duration::from_millis(500) }
  }
}

/// Sending side of the triage queue, cloned into request handlers
#[derive(Clone)]
pub struct TriageQueue {
  sender: mpsc::Sender<TriageJob>,
}

impl TriageQueue {
  /// Create a queue holding at most `capacity` pending jobs
  pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<TriageJob>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (Self { sender }, receiver)
  }

  /// Create a queue and spawn the worker that drains it
  pub fn start(
    capacity: usize,
    triage: Arc<dyn Triage>,
    jobs: JobLog,
    retry: RetryPolicy,
  ) -> (Self, TriageWorker) {
    let (queue, receiver) = Self::bounded(capacity);
    let worker = TriageWorker::spawn(receiver, triage, jobs, retry);
    (queue, worker)
  }

  /// Queue a submission without waiting for triage
  pub fn enqueue(&self, submission: FeedbackSubmission) -> Result<Uuid> {
    let job = TriageJob { id: Uuid::new_v4(), submission, enqueued_at: Utc::now() };
    let id = job.id;

    self.sender.try_send(job).map_err(|e| match e {
      TrySendError::Full(_) => FeedbackError::QueueUnavailable("triage queue is full".to_string()),
      TrySendError::Closed(_) => FeedbackError::QueueUnavailable("triage queue is closed".to_string()),
    })?;

    Ok(id)
  }
}

/// The single task that runs triage jobs in arrival order
pub struct TriageWorker {
  handle: JoinHandle<()>,
}

impl TriageWorker {
  pub fn spawn(
    receiver: mpsc::Receiver<TriageJob>,
    triage: Arc<dyn Triage>,
    jobs: JobLog,
    retry: RetryPolicy,
  ) -> Self {
    let handle = tokio::spawn(run_worker(receiver, triage, jobs, retry));
    Self { handle }
  }

  /// Wait until every queued job is done; returns once all senders are dropped
  pub async fn join(self) {
    if let Err(e) = self.handle.await {
      error!("Triage worker terminated abnormally: {e}");
    }
  }
}

async fn run_worker(
  mut receiver: mpsc::Receiver<TriageJob>,
  triage: Arc<dyn Triage>,
  jobs: JobLog,
  retry: RetryPolicy,
) {
  info!("Triage worker started");

  while let Some(job) = receiver.recv().await {
    let record = process_job(&job, triage.as_ref(), retry).await;
    jobs.record(record).await;
  }

  info!("Triage queue closed, worker exiting");
}

/// Run one attempt; a panic becomes a non-retryable failure of this job only
async fn attempt(job: &TriageJob, triage: &dyn Triage) -> Result<TriageReport> {
  AssertUnwindSafe(triage.triage(&job.submission))
    .catch_unwind()
    .await
    .unwrap_or_else(|panic| Err(FeedbackError::Internal(format!("triage panicked: {}", panic_message(&panic)))))
}

fn panic_message(panic: &Box<dyn Any + Send>) -> &str {
  if let Some(message) = panic.downcast_ref::<&str>() {
    message
  } else if let Some(message) = panic.downcast_ref::<String>() {
    message
  } else {
    "non-string panic payload"
  }
}

/// Run one job, retrying only failures that happened before any write
async fn process_job(job: &TriageJob, triage: &dyn Triage, retry: RetryPolicy) -> JobRecord {
  let max_attempts = retry.max_attempts.max(1);
  let mut attempts = 0;

  loop {
    attempts += 1;

    match attempt(job, triage).await {
      Ok(report) => {
        info!("Job {} {} feedback {}", job.id, report.outcome.action(), report.outcome.feedback_id());
        return JobRecord {
          job_id: job.id,
          status: JobStatus::Succeeded,
          feedback_title: job.submission.feedback_title.clone(),
          attempts,
          outcome: Some(report.outcome),
          error: None,
          notification_error: report.notification_error,
          enqueued_at: job.enqueued_at,
          finished_at: Utc::now(),
        };
      }
      Err(e) if e.is_retryable() && attempts < max_attempts => {
        warn!("Job {} attempt {attempts}/{max_attempts} failed, retrying: {e}", job.id);
        tokio::time::sleep(retry.delay * attempts).await;
      }
      Err(e) => {
        error!("Job {} failed after {attempts} attempt(s): {e}", job.id);
        return JobRecord {
          job_id: job.id,
          status: JobStatus::Failed,
          feedback_title: job.submission.feedback_title.clone(),
          attempts,
          outcome: None,
          error: Some(e.to_string()),
          notification_error: None,
          enqueued_at: job.enqueued_at,
          finished_at: Utc::now(),
        };
      }
    }
  }
}
