//! Request context middleware
//!
//! Every request gets a [`RequestContext`] with a fresh request id, inserted
//! into the request extensions and attached to the request's log lines.

use axum::{
  extract::Request,
  http::{HeaderMap, Method, Uri},
  middleware::Next,
  response::Response,
};
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Request metadata available to handlers through `Extension<RequestContext>`
#[derive(Clone, Debug)]
pub struct RequestContext {
  /// Unique ID for this request
  pub request_id: Uuid,
  pub method: Method,
  pub uri: Uri,
  pub user_agent: String,
}

impl RequestContext {
  pub fn new(method: Method, uri: Uri, headers: &HeaderMap) -> Self {
    let user_agent = headers
      .get("user-agent")
      .and_then(|v| v.to_str().ok())
      .unwrap_or("none")
      .to_string();

    Self { request_id: Uuid::new_v4(), method, uri, user_agent }
  }

  pub fn log_info(&self, message: &str) {
    info!(request_id = %self.request_id, "{} {} - {message}", self.method, self.uri.path());
  }

  pub fn log_warn(&self, message: &str) {
    warn!(request_id = %self.request_id, "{} {} - {message}", self.method, self.uri.path());
  }
}

/// Middleware to inject RequestContext into all requests
pub async fn request_context_middleware(mut request: Request, next: Next) -> Response {
  let context = RequestContext::new(request.method().clone(), request.uri().clone(), request.headers());

  let start_time = Instant::now();
  request.extensions_mut().insert(context.clone());

  let response = next.run(request).await;

  let duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;
  info!(
    request_id = %context.request_id,
    status = response.status().as_u16(),
    "{} {} completed in {duration_ms:.2}ms (User-Agent: {})",
    context.method,
    context.uri.path(),
    context.user_agent
  );

  response
}
