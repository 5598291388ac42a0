//! Advisory checks over a graph snapshot.
//!
//! Nothing here stops a run. The orchestrator logs each finding as a warning
//! and relies on the scheduler and the node executors for hard failures.

use std::fmt;

use crate::node::NodeKind;
use crate::snapshot::GraphSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
  Warning,
  Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
  /// Two nodes share an id; the snapshot cannot be scheduled.
  DuplicateNode { node_id: String },
  /// Edge references a node missing from the snapshot; it will be ignored.
  DanglingEdge {
    edge_id: String,
    source: String,
    target: String,
  },
  /// Invocation node without a model id; it will fail when reached.
  MissingModel { node_id: String },
  /// Node with no edges at all.
  Disconnected { node_id: String },
  /// Graph has executable nodes but no sink.
  NoSink,
}

impl ValidationIssue {
  pub fn severity(&self) -> Severity {
    match self {
      ValidationIssue::DuplicateNode { .. } => Severity::Error,
      _ => Severity::Warning,
    }
  }

  /// Node the issue is about, if any.
  pub fn node_id(&self) -> Option<&str> {
    match self {
      ValidationIssue::DuplicateNode { node_id }
      | ValidationIssue::MissingModel { node_id }
      | ValidationIssue::Disconnected { node_id } => Some(node_id),
      ValidationIssue::DanglingEdge { .. } | ValidationIssue::NoSink => None,
    }
  }
}

impl fmt::Display for ValidationIssue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ValidationIssue::DuplicateNode { node_id } => write!(f, "duplicate node id '{node_id}'"),
      ValidationIssue::DanglingEdge {
        edge_id,
        source,
        target,
      } => write!(
        f,
        "edge '{edge_id}' ({source} -> {target}) references a missing node and will be ignored"
      ),
      ValidationIssue::MissingModel { node_id } => {
        write!(f, "node '{node_id}' has no model selected")
      }
      ValidationIssue::Disconnected { node_id } => {
        write!(f, "node '{node_id}' is not connected to the workflow")
      }
      ValidationIssue::NoSink => write!(f, "workflow has no output node"),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
  pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
  /// True when no issue has [`Severity::Error`].
  pub fn is_valid(&self) -> bool {
    self.issues.iter().all(|i| i.severity() != Severity::Error)
  }

  pub fn is_empty(&self) -> bool {
    self.issues.is_empty()
  }
}

/// Check a snapshot for authoring mistakes.
pub fn validate(snapshot: &GraphSnapshot) -> ValidationReport {
  let graph = snapshot.graph();
  let mut issues: Vec<ValidationIssue> = graph
    .duplicate_ids()
    .iter()
    .map(|id| ValidationIssue::DuplicateNode {
      node_id: id.clone(),
    })
    .collect();

  for edge in &snapshot.edges {
    if graph.dropped_edges().contains(&edge.id) {
      issues.push(ValidationIssue::DanglingEdge {
        edge_id: edge.id.clone(),
        source: edge.source.clone(),
        target: edge.target.clone(),
      });
    }
  }

  let mut has_sink = false;
  let mut has_executable = false;
  for node in &snapshot.nodes {
    match &node.kind {
      NodeKind::Annotation { .. } => continue,
      NodeKind::Sink => has_sink = true,
      NodeKind::Invocation(config) if config.model_id.trim().is_empty() => {
        issues.push(ValidationIssue::MissingModel {
          node_id: node.id.clone(),
        });
      }
      _ => {}
    }
    has_executable = true;

    if !matches!(node.kind, NodeKind::Sink) && !graph.is_connected(&node.id) {
      issues.push(ValidationIssue::Disconnected {
        node_id: node.id.clone(),
      });
    }
  }

  if has_executable && !has_sink {
    issues.push(ValidationIssue::NoSink);
  }

  ValidationReport { issues }
}
