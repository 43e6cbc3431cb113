//! Feedback REST Server
//!
//! Accepts customer feedback over HTTP and triages it in the background:
//! near-duplicates upvote the existing record, new topics are stored.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use feedback::server::config::ServerConfig;
use feedback::server::startup::start_server;

#[tokio::main]
async fn main() -> Result<()> {
  // A missing .env file is fine; real environment variables still apply
  dotenvy::dotenv().ok();

  let config = ServerConfig::parse();

  // RUST_LOG wins; otherwise keep Lance and DataFusion quiet
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
    if config.verbose {
      EnvFilter::new("debug,lance=warn,lance_datafusion=warn,datafusion=warn,hyper=info")
    } else {
      EnvFilter::new("feedback=info,feedback_server=info,tower_http=info,lance=error,lance_datafusion=error,datafusion=error,warn")
    }
  });

  tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

  info!("Starting Feedback Server v{}", env!("CARGO_PKG_VERSION"));
  info!("Binding to address: {}", config.bind);

  start_server(config).await
}
