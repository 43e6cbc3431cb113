//! Feedback - Customer Feedback Intake and Triage
//!
//! Accepts feedback submissions over HTTP, detects near-duplicate feedback
//! through embedding similarity, and keeps one upvoted record per topic.

pub mod server;
