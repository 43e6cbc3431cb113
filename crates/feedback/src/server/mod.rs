//! REST server for the feedback service
//!
//! Intake endpoints, the triage queue behind them, and the storage and
//! embedding services the triage pipeline depends on.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routing;
pub mod services;
pub mod startup;
pub mod state;
pub mod types;
