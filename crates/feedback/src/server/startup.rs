//! REST server startup and wiring
//!
//! Shared resources are built once here and injected into the router and the
//! triage worker. Shutdown stops accepting requests, then lets the worker
//! finish every job already queued.

use anyhow::{Context, Result};
use axum::serve;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::server::config::{ServerConfig, StoreBackend};
use crate::server::error::FeedbackError;
use crate::server::routing::create_router;
use crate::server::services::duplicates::{DuplicateResolver, MatchPolicy};
use crate::server::services::embeddings::{Embedder, OpenAiEmbedder};
use crate::server::services::feedback_store::{FeedbackStore, SimilarityIndex};
use crate::server::services::jobs::JobLog;
use crate::server::services::memory_store::InMemoryFeedbackStore;
use crate::server::services::notifier::{LogNotifier, Notifier, ResendNotifier};
use crate::server::services::queue::{RetryPolicy, TriageQueue, TriageWorker};
use crate::server::services::triage::FeedbackTriage;
use crate::server::state::AppState;

/// The collaborators the triage pipeline is built from
pub struct Components {
  pub store: Arc<dyn FeedbackStore>,
  pub index: Arc<dyn SimilarityIndex>,
  pub embedder: Arc<dyn Embedder>,
  pub notifier: Arc<dyn Notifier>,
}

impl Components {
  /// Components over the in-memory store
  pub fn in_memory(embedder: Arc<dyn Embedder>, notifier: Arc<dyn Notifier>) -> Self {
    let (store, index) = in_memory_store();
    Self { store, index, embedder, notifier }
  }
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
  pub match_policy: MatchPolicy,
  pub retry: RetryPolicy,
  pub queue_capacity: usize,
  pub job_history: usize,
}

impl Default for PipelineSettings {
  fn default() -> Self {
    Self { match_policy: MatchPolicy::default(), retry: RetryPolicy::default(), queue_capacity: 256, job_history: 500 }
  }
}

impl From<&ServerConfig> for PipelineSettings {
  fn from(config: &ServerConfig) -> Self {
    Self {
      match_policy: config.match_policy(),
      retry: config.retry_policy(),
      queue_capacity: config.queue_capacity,
      job_history: config.job_history,
    }
  }
}

/// Application state plus the worker draining its queue
pub struct Runtime {
  pub state: AppState,
  pub worker: TriageWorker,
}

/// Wire components into a running triage pipeline
pub fn assemble(components: Components, settings: PipelineSettings) -> Runtime {
  let resolver = DuplicateResolver::new(components.embedder, components.index, settings.match_policy);
  let triage = Arc::new(FeedbackTriage::new(resolver, components.store.clone(), components.notifier));

  let jobs = JobLog::new(settings.job_history);
  let (queue, worker) = TriageQueue::start(settings.queue_capacity, triage, jobs.clone(), settings.retry);

  Runtime { state: AppState::new(components.store, queue, jobs), worker }
}

/// Build the production components described by the configuration
pub async fn build_components(config: &ServerConfig) -> std::result::Result<Components, FeedbackError> {
  let (store, index) = open_store(config).await?;

  let embedder: Arc<dyn Embedder> = Arc::new(OpenAiEmbedder::new(config.embedding_config())?);

  let notifier: Arc<dyn Notifier> = match config.resend_config() {
    Some(resend) => {
      info!("Acknowledgements will be emailed from {}", resend.sender);
      Arc::new(ResendNotifier::new(resend)?)
    }
    None => {
      info!("No Resend API key configured, acknowledgements will only be logged");
      Arc::new(LogNotifier)
    }
  };

  Ok(Components { store, index, embedder, notifier })
}

fn in_memory_store() -> (Arc<dyn FeedbackStore>, Arc<dyn SimilarityIndex>) {
  let memory = Arc::new(InMemoryFeedbackStore::new());
  let store: Arc<dyn FeedbackStore> = memory.clone();
  let index: Arc<dyn SimilarityIndex> = memory;
  (store, index)
}

async fn open_store(
  config: &ServerConfig,
) -> std::result::Result<(Arc<dyn FeedbackStore>, Arc<dyn SimilarityIndex>), FeedbackError> {
  match config.store {
    StoreBackend::Memory => {
      warn!("Using the in-memory store; feedback is lost on restart");
      Ok(in_memory_store())
    }
    #[cfg(feature = "lancedb-store")]
    StoreBackend::Lancedb => {
      use crate::server::services::lancedb::LanceDbFeedbackStore;

      let lance =
        Arc::new(LanceDbFeedbackStore::open(&config.data_dir, &config.collection, config.embedding_dimension).await?);
      let store: Arc<dyn FeedbackStore> = lance.clone();
      let index: Arc<dyn SimilarityIndex> = lance;
      Ok((store, index))
    }
    #[cfg(not(feature = "lancedb-store"))]
    StoreBackend::Lancedb => {
      Err(FeedbackError::Config("built without the lancedb-store feature; use --store memory".to_string()))
    }
  }
}

/// Start the REST server and run until a shutdown signal arrives
pub async fn start_server(config: ServerConfig) -> Result<()> {
  config.validate().context("Invalid configuration")?;

  let components = build_components(&config).await.context("Failed to initialise services")?;
  let Runtime { state, worker } = assemble(components, PipelineSettings::from(&config));

  let app = create_router(state);

  let listener = TcpListener::bind(config.bind).await.with_context(|| format!("Failed to bind {}", config.bind))?;
  info!("Feedback server listening on {}", config.bind);

  serve(listener, app).with_graceful_shutdown(shutdown_signal()).await.context("Server error")?;

  // The router and its queue handles are gone; the worker drains what is left
  info!("Server stopped accepting requests, finishing queued triage jobs");
  worker.join().await;
  info!("Server shutdown gracefully");

  Ok(())
}

async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      warn!("Failed to listen for ctrl+c: {e}");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
      Ok(mut signal) => {
        signal.recv().await;
      }
      Err(e) => {
        warn!("Failed to listen for SIGTERM: {e}");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }
}
