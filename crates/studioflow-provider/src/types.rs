use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A single model invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationRequest {
  pub model_id: String,
  pub inputs: Map<String, Value>,
}

impl InvocationRequest {
  pub fn new(model_id: impl Into<String>, inputs: Map<String, Value>) -> Self {
    Self {
      model_id: model_id.into(),
      inputs,
    }
  }
}

/// Answer to a synchronous call or to a queue submission.
///
/// A submission that comes back without a `request_id` was processed
/// synchronously and carries its output in `data`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
  #[serde(default)]
  pub success: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(default, alias = "request_id", skip_serializing_if = "Option::is_none")]
  pub request_id: Option<String>,
}

impl SyncResponse {
  pub fn ok(data: Value) -> Self {
    Self {
      success: true,
      data: Some(data),
      ..Self::default()
    }
  }

  pub fn queued(request_id: impl Into<String>) -> Self {
    Self {
      success: true,
      request_id: Some(request_id.into()),
      ..Self::default()
    }
  }

  pub fn failed(error: impl Into<String>) -> Self {
    Self {
      success: false,
      error: Some(error.into()),
      ..Self::default()
    }
  }
}

/// Lifecycle state of a queued job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobState {
  InQueue,
  InProgress,
  Completed,
  Failed,
  /// Any status this client does not know; treated as non-terminal.
  Other(String),
}

impl JobState {
  pub fn as_str(&self) -> &str {
    match self {
      JobState::InQueue => "IN_QUEUE",
      JobState::InProgress => "IN_PROGRESS",
      JobState::Completed => "COMPLETED",
      JobState::Failed => "FAILED",
      JobState::Other(status) => status,
    }
  }

  pub fn is_terminal(&self) -> bool {
    matches!(self, JobState::Completed | JobState::Failed)
  }
}

impl From<String> for JobState {
  fn from(status: String) -> Self {
    match status.to_ascii_uppercase().as_str() {
      "IN_QUEUE" => JobState::InQueue,
      "IN_PROGRESS" => JobState::InProgress,
      "COMPLETED" => JobState::Completed,
      "FAILED" => JobState::Failed,
      _ => JobState::Other(status),
    }
  }
}

impl From<JobState> for String {
  fn from(state: JobState) -> Self {
    match state {
      JobState::Other(status) => status,
      other => other.as_str().to_string(),
    }
  }
}

/// One status poll of a queued job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
  pub status: JobState,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub result: Option<Value>,
  #[serde(default, alias = "queue_position", skip_serializing_if = "Option::is_none")]
  pub queue_position: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  /// Sent as `null` when logs were not requested.
  #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
  pub logs: Vec<Value>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Value>, D::Error> {
  Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl StatusResponse {
  pub fn new(status: JobState) -> Self {
    Self {
      status,
      result: None,
      queue_position: None,
      error: None,
      logs: Vec::new(),
    }
  }

  pub fn with_result(mut self, result: Value) -> Self {
    self.result = Some(result);
    self
  }

  /// The job's output: `result`, or the `result` of the last log entry.
  pub fn into_result(self) -> Option<Value> {
    if let Some(result) = self.result.filter(|r| !r.is_null()) {
      return Some(result);
    }
    self
      .logs
      .into_iter()
      .last()
      .and_then(|mut entry| entry.get_mut("result").map(Value::take))
      .filter(|r| !r.is_null())
  }
}

/// Progress of a queued job, reported after every poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollProgress {
  pub status: JobState,
  /// Polls made so far, starting at 1.
  pub attempts: u32,
  pub max_attempts: u32,
  pub request_id: String,
}

impl PollProgress {
  /// `attempts / max_attempts`, capped at 0.95 so a job is never shown done
  /// before its result arrives.
  pub fn fraction(&self) -> f64 {
    if self.max_attempts == 0 {
      return 0.0;
    }
    (f64::from(self.attempts) / f64::from(self.max_attempts)).min(0.95)
  }
}
