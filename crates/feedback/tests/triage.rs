mod common;

use mockito::Server;
use std::sync::Arc;
use std::time::Duration;

use common::{submission, wait_for_jobs, FailingNotifier, KeywordEmbedder, RecordingNotifier};
use feedback::server::services::embeddings::{EmbeddingServiceConfig, OpenAiEmbedder};
use feedback::server::services::jobs::JobStatus;
use feedback::server::services::notifier::Notifier;
use feedback::server::services::queue::RetryPolicy;
use feedback::server::services::triage::TriageOutcome;
use feedback::server::startup::{assemble, Components, PipelineSettings, Runtime};

fn keyword_runtime(notifier: Arc<dyn Notifier>) -> Runtime {
  assemble(Components::in_memory(Arc::new(KeywordEmbedder), notifier), PipelineSettings::default())
}

#[tokio::test]
async fn test_same_topic_upvotes_existing_record() {
  let notifier = Arc::new(RecordingNotifier::default());
  let runtime = keyword_runtime(notifier.clone());
  let state = runtime.state.clone();

  state
    .queue
    .enqueue(submission("ada@example.com", "Add dark theme", "A dark mode option would be great"))
    .unwrap();
  state
    .queue
    .enqueue(submission("bob@example.com", "Dark mode please", "Night owls want a darker UI"))
    .unwrap();
  wait_for_jobs(&state.jobs, 2).await;

  let records = state.store.list().await.unwrap();
  assert_eq!(records.len(), 1);
  assert_eq!(records[0].upvotes, 2);
  // The first submitter's record is the one that survives
  assert_eq!(records[0].email, "ada@example.com");
  assert!(records[0].updated_at >= records[0].created_at);

  let jobs = state.jobs.recent(None, None).await;
  assert_eq!(jobs[0].outcome, Some(TriageOutcome::Upvoted { id: records[0].id.clone(), upvotes: 2 }));
  assert_eq!(jobs[1].outcome, Some(TriageOutcome::Created { id: records[0].id.clone() }));

  let sent = notifier.sent.lock().await;
  assert_eq!(
    *sent,
    vec![
      ("ada@example.com".to_string(), "created".to_string()),
      ("bob@example.com".to_string(), "upvoted".to_string())
    ]
  );
}

#[tokio::test]
async fn test_unrelated_topics_create_separate_records() {
  let runtime = keyword_runtime(Arc::new(RecordingNotifier::default()));
  let state = runtime.state.clone();

  state.queue.enqueue(submission("ada@example.com", "Add dark theme", "Dark mode for the dashboard")).unwrap();
  state.queue.enqueue(submission("bob@example.com", "PDF export broken", "Export crashes on large reports")).unwrap();
  wait_for_jobs(&state.jobs, 2).await;

  let records = state.store.list().await.unwrap();
  assert_eq!(records.len(), 2);
  assert!(records.iter().all(|record| record.upvotes == 1));
  assert_ne!(records[0].id, records[1].id);
}

#[tokio::test]
async fn test_repeated_topic_counts_every_submission() {
  let runtime = keyword_runtime(Arc::new(RecordingNotifier::default()));
  let state = runtime.state.clone();

  for email in ["a@example.com", "b@example.com", "c@example.com", "d@example.com"] {
    state.queue.enqueue(submission(email, "Login keeps failing", "Password reset loops back")).unwrap();
  }
  state.queue.enqueue(submission("e@example.com", "Night theme", "Please add a dark mode")).unwrap();
  wait_for_jobs(&state.jobs, 5).await;

  let records = state.store.list().await.unwrap();
  assert_eq!(records.len(), 2);
  assert_eq!(records[0].title, "Login keeps failing");
  assert_eq!(records[0].upvotes, 4);
  assert_eq!(records[1].upvotes, 1);
}

#[tokio::test]
async fn test_notification_failure_keeps_the_record() {
  let runtime = keyword_runtime(Arc::new(FailingNotifier));
  let state = runtime.state.clone();

  state.queue.enqueue(submission("ada@example.com", "Add dark theme", "Dark mode please")).unwrap();
  wait_for_jobs(&state.jobs, 1).await;

  let job = &state.jobs.recent(None, None).await[0];
  assert_eq!(job.status, JobStatus::Succeeded);
  assert!(job.notification_error.as_deref().unwrap().contains("provider unavailable"));
  assert_eq!(state.store.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_embedding_outage_is_retried_then_recorded() {
  let mut server = Server::new_async().await;
  let mock = server
    .mock("POST", "/embeddings")
    .with_status(503)
    .with_body("upstream overloaded")
    .expect(2)
    .create_async()
    .await;

  let embedder = OpenAiEmbedder::new(EmbeddingServiceConfig {
    base_url: server.url(),
    api_key: "sk-test".to_string(),
    model: "text-embedding-3-small".to_string(),
    dimension: Some(4),
    timeout_secs: 5,
  })
  .unwrap();

  let settings = PipelineSettings {
    retry: RetryPolicy { max_attempts: 2, delay: Duration::from_millis(1) },
    ..PipelineSettings::default()
  };
  let runtime = assemble(Components::in_memory(Arc::new(embedder), Arc::new(RecordingNotifier::default())), settings);
  let state = runtime.state.clone();

  state.queue.enqueue(submission("ada@example.com", "Add dark theme", "Dark mode please")).unwrap();
  wait_for_jobs(&state.jobs, 1).await;

  let job = &state.jobs.recent(None, None).await[0];
  assert_eq!(job.status, JobStatus::Failed);
  assert_eq!(job.attempts, 2);
  assert!(state.store.list().await.unwrap().is_empty());
  mock.assert_async().await;
}

#[tokio::test]
async fn test_shutdown_drains_queued_jobs() {
  let Runtime { state, worker } = keyword_runtime(Arc::new(RecordingNotifier::default()));
  let jobs = state.jobs.clone();
  let store = state.store.clone();

  for i in 0..10 {
    state.queue.enqueue(submission("ada@example.com", &format!("Dark theme #{i}"), "Dark mode please")).unwrap();
  }
  drop(state);
  worker.join().await;

  assert_eq!(jobs.len().await, 10);
  let records = store.list().await.unwrap();
  assert_eq!(records.len(), 1);
  assert_eq!(records[0].upvotes, 10);
}
