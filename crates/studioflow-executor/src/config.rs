use serde::{Deserialize, Serialize};
use studioflow_graph::InvocationMode;
use studioflow_provider::PollConfig;

/// Configuration for the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
  /// Run records kept in the history; the oldest is evicted first.
  pub history_limit: usize,
  /// Mode used by invocation nodes that do not set one.
  pub default_mode: InvocationMode,
  pub poll: PollConfig,
}

impl Default for ExecutorConfig {
  fn default() -> Self {
    Self {
      history_limit: 20,
      default_mode: InvocationMode::Queue,
      poll: PollConfig::default(),
    }
  }
}
