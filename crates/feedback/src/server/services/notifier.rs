//! Acknowledgement messages to feedback submitters
//!
//! Submitters are thanked once their feedback has been stored or counted.
//! With a Resend API key configured the message goes out as email; without
//! one it is only logged.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::server::error::{FeedbackError, Result};
use crate::server::services::triage::TriageOutcome;
use crate::server::types::FeedbackSubmission;

pub const RESEND_API_URL: &str = "https://api.resend.com";

/// A rendered acknowledgement
#[derive(Debug, Clone, PartialEq)]
pub struct Acknowledgement {
  pub to: String,
  pub subject: String,
  pub html: String,
}

impl Acknowledgement {
  pub fn compose(submission: &FeedbackSubmission, outcome: &TriageOutcome) -> Self {
    let name = escape_html(&submission.customer_name);
    let title = escape_html(&submission.feedback_title);

    let body = match outcome {
      TriageOutcome::Created { .. } => format!(
        "<p>Hi {name},</p>\
         <p>Thank you for your feedback <strong>&quot;{title}&quot;</strong>. \
         It has been logged and shared with our product team.</p>"
      ),
      TriageOutcome::Upvoted { upvotes, .. } => format!(
        "<p>Hi {name},</p>\
         <p>Thank you for your feedback <strong>&quot;{title}&quot;</strong>. \
         Other customers have asked for the same thing, so we added your vote to the \
         existing request. It now has {upvotes} votes.</p>"
      ),
    };

    Self {
      to: submission.customer_email.clone(),
      subject: "Thanks for your feedback".to_string(),
      html: format!("{body}<p>Best regards,<br>The Support Team</p>"),
    }
  }
}

/// Delivers acknowledgements to submitters
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
  async fn acknowledge(&self, submission: &FeedbackSubmission, outcome: &TriageOutcome) -> Result<()>;
}

/// Notifier that only writes the acknowledgement to the log
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
  async fn acknowledge(&self, submission: &FeedbackSubmission, outcome: &TriageOutcome) -> Result<()> {
    let message = Acknowledgement::compose(submission, outcome);
    info!("Acknowledgement for {} ({}): {}", message.to, outcome.action(), message.subject);
    Ok(())
  }
}

#[derive(Debug, Clone)]
pub struct ResendConfig {
  pub base_url: String,
  pub api_key: String,
  /// Address acknowledgements are sent from
  pub sender: String,
  pub timeout_secs: u64,
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
  from: &'a str,
  to: Vec<&'a str>,
  subject: &'a str,
  html: &'a str,
}

/// Notifier that sends email through the Resend API
pub struct ResendNotifier {
  client: Client,
  config: ResendConfig,
}

impl ResendNotifier {
  pub fn new(config: ResendConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| FeedbackError::Config(format!("Failed to create HTTP client: {e}")))?;

    Ok(Self { client, config })
  }

  async fn send(&self, message: &Acknowledgement) -> Result<()> {
    let url = format!("{}/emails", self.config.base_url.trim_end_matches('/'));
    let request = SendEmailRequest {
      from: &self.config.sender,
      to: vec![&message.to],
      subject: &message.subject,
      html: &message.html,
    };

    let response = self
      .client
      .post(url)
      .bearer_auth(&self.config.api_key)
      .json(&request)
      .send()
      .await
      .map_err(|e| FeedbackError::Notification(format!("Request failed: {e}")))?;

    if !response.status().is_success() {
      let status = response.status();
      let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
      return Err(FeedbackError::Notification(format!(
        "Email request failed with status {status}: {error_text}"
      )));
    }

    debug!("Sent acknowledgement email to {}", message.to);
    Ok(())
  }
}

#[async_trait]
impl Notifier for ResendNotifier {
  async fn acknowledge(&self, submission: &FeedbackSubmission, outcome: &TriageOutcome) -> Result<()> {
    self.send(&Acknowledgement::compose(submission, outcome)).await
  }
}

fn escape_html(text: &str) -> String {
  let mut escaped = String::with_capacity(text.len());
  for c in text.chars() {
    match c {
      '&' => escaped.push_str("&amp;"),
      '<' => escaped.push_str("&lt;"),
      '>' => escaped.push_str("&gt;"),
      '"' => escaped.push_str("&quot;"),
      '\'' => escaped.push_str("&#39;"),
      _ => escaped.push(c),
    }
  }
  escaped
}
