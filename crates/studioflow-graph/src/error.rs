use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
  /// The graph is not a DAG. Carries the ids that could not be ordered,
  /// in snapshot order.
  #[error("workflow contains cycles (unordered nodes: {})", nodes.join(", "))]
  Cycle { nodes: Vec<String> },

  #[error("duplicate node id: {0}")]
  DuplicateNode(String),
}
