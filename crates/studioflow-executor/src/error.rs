//! Executor error types.

use studioflow_graph::GraphError;
use studioflow_provider::ProviderError;

/// Errors that end a node, and with it the run.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
  /// The snapshot cannot be scheduled. Raised before any node runs.
  #[error(transparent)]
  Graph(#[from] GraphError),

  /// An invocation node has no model selected.
  #[error("no model selected for node '{node_id}'")]
  MissingModel { node_id: String },

  /// The model service reported an error.
  #[error("{source}")]
  Provider {
    node_id: String,
    #[source]
    source: ProviderError,
  },

  /// A queued job never reached a terminal state.
  #[error("polling timeout after {attempts} attempts")]
  PollingTimeout { node_id: String, attempts: u32 },

  /// The run was cancelled while this node was current.
  #[error("execution cancelled")]
  Cancelled { node_id: String },
}

impl ExecutionError {
  /// Lift a provider failure to the node it happened in.
  pub fn from_provider(node_id: &str, source: ProviderError) -> Self {
    let node_id = node_id.to_string();
    match source {
      ProviderError::PollingTimeout { attempts } => ExecutionError::PollingTimeout { node_id, attempts },
      ProviderError::Cancelled => ExecutionError::Cancelled { node_id },
      source => ExecutionError::Provider { node_id, source },
    }
  }

  /// Node the error is attributed to. `None` for run-level errors.
  pub fn node_id(&self) -> Option<&str> {
    match self {
      ExecutionError::Graph(_) => None,
      ExecutionError::MissingModel { node_id }
      | ExecutionError::Provider { node_id, .. }
      | ExecutionError::PollingTimeout { node_id, .. }
      | ExecutionError::Cancelled { node_id } => Some(node_id),
    }
  }

  pub fn is_cancelled(&self) -> bool {
    matches!(self, ExecutionError::Cancelled { .. })
  }
}
