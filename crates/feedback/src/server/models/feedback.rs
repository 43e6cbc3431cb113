//! Feedback records as stored in the feedback collection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored feedback record, one per distinct topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
  pub id: String,
  pub email: String,
  pub name: String,
  pub title: String,
  pub description: String,
  pub embedding: Vec<f32>,
  pub upvotes: u64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Public projection of a record; never carries the embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSummary {
  pub id: String,
  pub email: String,
  pub name: String,
  pub title: String,
  pub description: String,
  pub upvotes: u64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Input for inserting a first-of-its-topic record
#[derive(Debug, Clone)]
pub struct NewFeedback {
  pub email: String,
  pub name: String,
  pub title: String,
  pub description: String,
  pub embedding: Vec<f32>,
}

/// Result of an upvote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpvoteStatus {
  pub id: String,
  pub upvotes: u64,
}

impl FeedbackRecord {
  /// Create a fresh record with a new id, one upvote and both timestamps at now
  pub fn create(feedback: NewFeedback) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4().to_string(),
      email: feedback.email,
      name: feedback.name,
      title: feedback.title,
      description: feedback.description,
      embedding: feedback.embedding,
      upvotes: 1,
      created_at: now,
      updated_at: now,
    }
  }

  pub fn summary(&self) -> FeedbackSummary {
    FeedbackSummary {
      id: self.id.clone(),
      email: self.email.clone(),
      name: self.name.clone(),
      title: self.title.clone(),
      description: self.description.clone(),
      upvotes: self.upvotes,
      created_at: self.created_at,
      updated_at: self.updated_at,
    }
  }
}

/// Text the embedding of a submission is computed from
pub fn embedding_text(title: &str, description: &str) -> String {
  format!("{title}\n{description}")
}

#[cfg(test)]
mod tests {
  use super::*;

  fn new_feedback() -> NewFeedback {
    NewFeedback {
      email: "ada@example.com".to_string(),
      name: "Ada".to_string(),
      title: "Dark mode request".to_string(),
      description: "Please add a dark theme".to_string(),
      embedding: vec![0.1, 0.2, 0.3],
    }
  }

  #[test]
  fn test_create_starts_with_one_upvote() {
    let record = FeedbackRecord::create(new_feedback());

    assert_eq!(record.upvotes, 1);
    assert_eq!(record.created_at, record.updated_at);
    assert!(Uuid::parse_str(&record.id).is_ok());
  }

  #[test]
  fn test_create_assigns_distinct_ids() {
    let first = FeedbackRecord::create(new_feedback());
    let second = FeedbackRecord::create(new_feedback());
    assert_ne!(first.id, second.id);
  }

  #[test]
  fn test_summary_drops_embedding() {
    let record = FeedbackRecord::create(new_feedback());
    let json = serde_json::to_value(record.summary()).unwrap();

    assert!(json.get("embedding").is_none());
    assert_eq!(json["title"], "Dark mode request");
    assert_eq!(json["upvotes"], 1);
  }

  #[test]
  fn test_embedding_text_joins_with_newline() {
    assert_eq!(embedding_text("Title", "Body"), "Title\nBody");
  }
}
