//! Adapter behavior against a scripted in-process model service.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use studioflow_graph::InvocationMode;
use studioflow_provider::{
  InvocationRequest, JobState, ModelClient, PollConfig, PollProgress, ProviderAdapter,
  ProviderError, StatusResponse, SyncResponse,
};
use tokio_util::sync::CancellationToken;

/// Answers `run`/`submit` with fixed responses and `status` from a script.
/// Once the script is exhausted every poll reports `IN_PROGRESS`.
#[derive(Default)]
struct ScriptedClient {
  run: Option<SyncResponse>,
  submit: Option<SyncResponse>,
  statuses: Mutex<VecDeque<StatusResponse>>,
  polls: Mutex<u32>,
}

impl ScriptedClient {
  fn queued(statuses: Vec<StatusResponse>) -> Self {
    Self {
      submit: Some(SyncResponse::queued("req-1")),
      statuses: Mutex::new(statuses.into()),
      ..Self::default()
    }
  }

  fn polls(&self) -> u32 {
    *self.polls.lock().unwrap()
  }
}

#[async_trait]
impl ModelClient for ScriptedClient {
  async fn run(&self, _request: &InvocationRequest) -> Result<SyncResponse, ProviderError> {
    Ok(self.run.clone().unwrap_or_default())
  }

  async fn submit(&self, _request: &InvocationRequest) -> Result<SyncResponse, ProviderError> {
    Ok(self.submit.clone().unwrap_or_default())
  }

  async fn status(
    &self,
    _model_id: &str,
    request_id: &str,
  ) -> Result<StatusResponse, ProviderError> {
    assert_eq!(request_id, "req-1");
    *self.polls.lock().unwrap() += 1;
    Ok(
      self
        .statuses
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| StatusResponse::new(JobState::InProgress)),
    )
  }
}

fn request() -> InvocationRequest {
  let mut inputs = Map::new();
  inputs.insert("prompt".to_string(), json!("a cat"));
  InvocationRequest::new("fal-ai/flux/dev", inputs)
}

fn adapter(client: Arc<ScriptedClient>, max_attempts: u32) -> ProviderAdapter {
  ProviderAdapter::new(
    client,
    PollConfig {
      interval_ms: 2000,
      max_attempts,
    },
  )
}

fn ignore(_: &PollProgress) {}

#[tokio::test(start_paused = true)]
async fn test_completes_after_three_polls() {
  let client = Arc::new(ScriptedClient::queued(vec![
    StatusResponse::new(JobState::InProgress),
    StatusResponse::new(JobState::InProgress),
    StatusResponse::new(JobState::Completed).with_result(json!({ "images": [{ "url": "x" }] })),
  ]));
  let seen = Mutex::new(Vec::new());

  let started = tokio::time::Instant::now();
  let output = adapter(client.clone(), 180)
    .invoke(
      request(),
      InvocationMode::Queue,
      |p: &PollProgress| seen.lock().unwrap().push((p.status.clone(), p.attempts)),
      &CancellationToken::new(),
    )
    .await
    .unwrap();

  assert_eq!(output, json!({ "images": [{ "url": "x" }] }));
  assert_eq!(client.polls(), 3);
  // One interval is waited before each poll.
  assert_eq!(started.elapsed(), Duration::from_millis(6000));
  assert_eq!(
    *seen.lock().unwrap(),
    vec![
      (JobState::InProgress, 1),
      (JobState::InProgress, 2),
      (JobState::Completed, 3),
    ]
  );
}

#[tokio::test(start_paused = true)]
async fn test_polling_timeout() {
  let client = Arc::new(ScriptedClient::queued(vec![]));

  let err = adapter(client.clone(), 4)
    .invoke(request(), InvocationMode::Queue, ignore, &CancellationToken::new())
    .await
    .unwrap_err();

  assert!(matches!(err, ProviderError::PollingTimeout { attempts: 4 }));
  assert_eq!(err.to_string(), "polling timeout after 4 attempts");
  assert_eq!(client.polls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_failed_job() {
  let mut failed = StatusResponse::new(JobState::Failed);
  failed.error = Some("nsfw content detected".to_string());
  let client = Arc::new(ScriptedClient::queued(vec![failed]));

  let err = adapter(client, 180)
    .invoke(request(), InvocationMode::Queue, ignore, &CancellationToken::new())
    .await
    .unwrap_err();

  assert!(matches!(err, ProviderError::JobFailed { .. }));
  assert_eq!(err.to_string(), "nsfw content detected");
}

#[tokio::test(start_paused = true)]
async fn test_completed_without_result() {
  let client = Arc::new(ScriptedClient::queued(vec![StatusResponse::new(
    JobState::Completed,
  )]));

  let err = adapter(client, 180)
    .invoke(request(), InvocationMode::Queue, ignore, &CancellationToken::new())
    .await
    .unwrap_err();

  assert_eq!(err.to_string(), "job completed but no result returned");
}

#[tokio::test]
async fn test_submission_without_request_id_is_synchronous() {
  let client = Arc::new(ScriptedClient {
    submit: Some(SyncResponse::ok(json!({ "url": "done.png" }))),
    ..ScriptedClient::default()
  });

  let output = adapter(client.clone(), 180)
    .invoke(request(), InvocationMode::Queue, ignore, &CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(output, json!({ "url": "done.png" }));
  assert_eq!(client.polls(), 0);
}

#[tokio::test]
async fn test_sync_mode() {
  let client = Arc::new(ScriptedClient {
    run: Some(SyncResponse::ok(json!({ "text": "hello" }))),
    ..ScriptedClient::default()
  });
  let output = adapter(client, 180)
    .invoke(request(), InvocationMode::Sync, ignore, &CancellationToken::new())
    .await
    .unwrap();
  assert_eq!(output, json!({ "text": "hello" }));

  let client = Arc::new(ScriptedClient {
    run: Some(SyncResponse::failed("model not found")),
    ..ScriptedClient::default()
  });
  let err = adapter(client, 180)
    .invoke(request(), InvocationMode::Sync, ignore, &CancellationToken::new())
    .await
    .unwrap_err();
  assert!(matches!(err, ProviderError::Rejected { .. }));
  assert_eq!(err.to_string(), "model not found");
}

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_poll_wait() {
  let client = Arc::new(ScriptedClient::queued(vec![]));
  let cancel = CancellationToken::new();

  let trigger = cancel.clone();
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(5000)).await;
    trigger.cancel();
  });

  let err = adapter(client.clone(), 180)
    .invoke(request(), InvocationMode::Queue, ignore, &cancel)
    .await
    .unwrap_err();

  assert!(matches!(err, ProviderError::Cancelled));
  // Polls at 2s and 4s; the wait for the third is interrupted at 5s.
  assert_eq!(client.polls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_result_from_logs() {
  let status: StatusResponse = serde_json::from_value(json!({
    "status": "COMPLETED",
    "logs": [{ "result": { "video": { "url": "v.mp4" } } }]
  }))
  .unwrap();
  let client = Arc::new(ScriptedClient::queued(vec![status]));

  let output: Value = adapter(client, 180)
    .invoke(request(), InvocationMode::Queue, ignore, &CancellationToken::new())
    .await
    .unwrap();
  assert_eq!(output["video"]["url"], "v.mp4");
}
