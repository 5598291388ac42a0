//! Model invocation.
//!
//! The adapter drives a [`ModelClient`] through either a single synchronous
//! round trip or a submit-then-poll cycle, and turns the service's answers
//! into an output value or a [`ProviderError`].

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use studioflow_graph::InvocationMode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::client::ModelClient;
use crate::error::ProviderError;
use crate::types::{InvocationRequest, JobState, PollProgress, SyncResponse};

/// Queue polling settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
  /// Wait before each status poll.
  pub interval_ms: u64,
  /// Polls made before giving up with [`ProviderError::PollingTimeout`].
  pub max_attempts: u32,
}

impl Default for PollConfig {
  fn default() -> Self {
    Self {
      interval_ms: 2000,
      max_attempts: 180,
    }
  }
}

impl PollConfig {
  pub fn interval(&self) -> Duration {
    Duration::from_millis(self.interval_ms)
  }
}

/// Invokes external models through a [`ModelClient`].
#[derive(Clone)]
pub struct ProviderAdapter {
  client: Arc<dyn ModelClient>,
  poll: PollConfig,
}

impl ProviderAdapter {
  pub fn new(client: Arc<dyn ModelClient>, poll: PollConfig) -> Self {
    Self { client, poll }
  }

  /// Invoke a model and return its raw output.
  ///
  /// In queue mode `on_progress` is called after every status poll. The
  /// cancellation token is raced against every network call and every wait.
  #[instrument(
    name = "provider_invoke",
    skip(self, request, on_progress, cancel),
    fields(model_id = %request.model_id)
  )]
  pub async fn invoke<F>(
    &self,
    request: InvocationRequest,
    mode: InvocationMode,
    on_progress: F,
    cancel: &CancellationToken,
  ) -> Result<Value, ProviderError>
  where
    F: Fn(&PollProgress) + Send + Sync,
  {
    match mode {
      InvocationMode::Sync => {
        let response = cancellable(cancel, self.client.run(&request)).await?;
        into_output(response)
      }
      InvocationMode::Queue => self.run_queued(&request, &on_progress, cancel).await,
    }
  }

  async fn run_queued<F>(
    &self,
    request: &InvocationRequest,
    on_progress: &F,
    cancel: &CancellationToken,
  ) -> Result<Value, ProviderError>
  where
    F: Fn(&PollProgress) + Send + Sync,
  {
    let submitted = cancellable(cancel, self.client.submit(request)).await?;
    let request_id = match &submitted.request_id {
      Some(id) if submitted.success => id.clone(),
      // No job handle: the service answered synchronously.
      _ => return into_output(submitted),
    };
    info!(model_id = %request.model_id, request_id = %request_id, "job_submitted");

    for attempts in 1..=self.poll.max_attempts {
      tokio::select! {
        _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
        _ = tokio::time::sleep(self.poll.interval()) => {}
      }

      let status = cancellable(
        cancel,
        self.client.status(&request.model_id, &request_id),
      )
      .await?;
      debug!(
        request_id = %request_id,
        status = status.status.as_str(),
        attempts,
        queue_position = ?status.queue_position,
        "poll_status"
      );

      on_progress(&PollProgress {
        status: status.status.clone(),
        attempts,
        max_attempts: self.poll.max_attempts,
        request_id: request_id.clone(),
      });

      match status.status {
        JobState::Completed => {
          info!(request_id = %request_id, attempts, "job_completed");
          return status.into_result().ok_or_else(|| ProviderError::JobFailed {
            message: "job completed but no result returned".to_string(),
          });
        }
        JobState::Failed => {
          let message = status
            .error
            .unwrap_or_else(|| "job failed".to_string());
          warn!(request_id = %request_id, error = %message, "job_failed");
          return Err(ProviderError::JobFailed { message });
        }
        _ => {}
      }
    }

    warn!(
      request_id = %request_id,
      attempts = self.poll.max_attempts,
      "polling_timeout"
    );
    Err(ProviderError::PollingTimeout {
      attempts: self.poll.max_attempts,
    })
  }
}

async fn cancellable<T>(
  cancel: &CancellationToken,
  call: impl Future<Output = Result<T, ProviderError>>,
) -> Result<T, ProviderError> {
  tokio::select! {
    _ = cancel.cancelled() => Err(ProviderError::Cancelled),
    result = call => result,
  }
}

fn into_output(response: SyncResponse) -> Result<Value, ProviderError> {
  if !response.success {
    let message = response
      .error
      .unwrap_or_else(|| "model request failed".to_string());
    return Err(ProviderError::Rejected { message });
  }
  response
    .data
    .ok_or_else(|| ProviderError::MalformedResponse("response has no data".to_string()))
}
