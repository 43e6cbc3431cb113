//! Shared application state handed to every handler

use std::sync::Arc;

use crate::server::services::feedback_store::FeedbackStore;
use crate::server::services::jobs::JobLog;
use crate::server::services::queue::TriageQueue;

#[derive(Clone)]
pub struct AppState {
  /// Read side for listings; writes only happen in the triage worker
  pub store: Arc<dyn FeedbackStore>,
  pub queue: TriageQueue,
  pub jobs: JobLog,
}

impl AppState {
  pub fn new(store: Arc<dyn FeedbackStore>, queue: TriageQueue, jobs: JobLog) -> Self {
    Self { store, queue, jobs }
  }
}
