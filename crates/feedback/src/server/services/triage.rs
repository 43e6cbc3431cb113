//! Triage of a single feedback submission
//!
//! [`Triage`] is the seam where an orchestrator plugs in. [`FeedbackTriage`]
//! runs the feedback path: resolve duplicates, upvote the matched record or
//! insert a new one, then acknowledge the submitter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::server::error::Result;
use crate::server::models::feedback::NewFeedback;
use crate::server::services::duplicates::DuplicateResolver;
use crate::server::services::feedback_store::FeedbackStore;
use crate::server::services::notifier::Notifier;
use crate::server::types::FeedbackSubmission;

/// What triage did to the feedback collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TriageOutcome {
  Created { id: String },
  Upvoted { id: String, upvotes: u64 },
}

impl TriageOutcome {
  pub fn action(&self) -> &'static str {
    match self {
      TriageOutcome::Created { .. } => "created",
      TriageOutcome::Upvoted { .. } => "upvoted",
    }
  }

  pub fn feedback_id(&self) -> &str {
    match self {
      TriageOutcome::Created { id } | TriageOutcome::Upvoted { id, .. } => id,
    }
  }
}

/// Result of a completed triage run
#[derive(Debug, Clone, PartialEq)]
pub struct TriageReport {
  pub outcome: TriageOutcome,
  /// Set when the collection was updated but the submitter could not be notified
  pub notification_error: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Triage: Send + Sync {
  async fn triage(&self, submission: &FeedbackSubmission) -> Result<TriageReport>;
}

pub struct FeedbackTriage {
  resolver: DuplicateResolver,
  store: Arc<dyn FeedbackStore>,
  notifier: Arc<dyn Notifier>,
}

impl FeedbackTriage {
  pub fn new(resolver: DuplicateResolver, store: Arc<dyn FeedbackStore>, notifier: Arc<dyn Notifier>) -> Self {
    Self { resolver, store, notifier }
  }

  async fn apply(&self, submission: &FeedbackSubmission) -> Result<TriageOutcome> {
    let resolution =
      self.resolver.resolve(&submission.feedback_title, &submission.feedback_description).await?;

    match resolution.check.matched_id {
      Some(id) if resolution.check.found => {
        let status = self.store.upvote(&id).await?;
        info!(
          "'{}' duplicates {} (score {:?}), upvotes now {}",
          submission.feedback_title, status.id, resolution.best_score, status.upvotes
        );
        Ok(TriageOutcome::Upvoted { id: status.id, upvotes: status.upvotes })
      }
      _ => {
        let id = self
          .store
          .insert(NewFeedback {
            email: submission.customer_email.clone(),
            name: submission.customer_name.clone(),
            title: submission.feedback_title.clone(),
            description: submission.feedback_description.clone(),
            embedding: resolution.embedding,
          })
          .await?;
        info!("'{}' stored as new feedback {id}", submission.feedback_title);
        Ok(TriageOutcome::Created { id })
      }
    }
  }
}

#[async_trait]
impl Triage for FeedbackTriage {
  async fn triage(&self, submission: &FeedbackSubmission) -> Result<TriageReport> {
    let outcome = self.apply(submission).await?;

    // The collection is already updated; a failed acknowledgement must not fail the job
    let notification_error = match self.notifier.acknowledge(submission, &outcome).await {
      Ok(()) => None,
      Err(e) => {
        warn!("Could not acknowledge feedback {}: {e}", outcome.feedback_id());
        Some(e.to_string())
      }
    };

    Ok(TriageReport { outcome, notification_error })
  }
}
