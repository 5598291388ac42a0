use std::sync::{PoisonError, RwLock};

use crate::edge::Edge;
use crate::node::Node;
use crate::snapshot::GraphSnapshot;

/// Source of the graph a run executes.
///
/// The executor calls `snapshot` exactly once at run start and treats the
/// returned value as immutable for the rest of the run.
pub trait GraphStore: Send + Sync {
  /// Point-in-time copy of the current nodes and edges.
  fn snapshot(&self) -> GraphSnapshot;
}

/// A snapshot is trivially a store of itself.
impl GraphStore for GraphSnapshot {
  fn snapshot(&self) -> GraphSnapshot {
    self.clone()
  }
}

/// In-memory graph store.
///
/// Suitable for embedding the executor behind an authoring surface or for tests.
/// Writers may edit the graph while a run is in flight; the run keeps working
/// from the snapshot it took.
#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
  graph: RwLock<GraphSnapshot>,
}

impl InMemoryGraphStore {
  pub fn new(graph: GraphSnapshot) -> Self {
    Self {
      graph: RwLock::new(graph),
    }
  }

  /// Replace the whole graph.
  pub fn replace(&self, graph: GraphSnapshot) {
    *self.graph.write().unwrap_or_else(PoisonError::into_inner) = graph;
  }

  /// Insert a node, replacing any node with the same id in place.
  pub fn upsert_node(&self, node: Node) {
    let mut graph = self.graph.write().unwrap_or_else(PoisonError::into_inner);
    match graph.nodes.iter_mut().find(|n| n.id == node.id) {
      Some(existing) => *existing = node,
      None => graph.nodes.push(node),
    }
  }

  /// Remove a node and every edge touching it.
  pub fn remove_node(&self, node_id: &str) {
    let mut graph = self.graph.write().unwrap_or_else(PoisonError::into_inner);
    graph.nodes.retain(|n| n.id != node_id);
    graph
      .edges
      .retain(|e| e.source != node_id && e.target != node_id);
  }

  pub fn add_edge(&self, edge: Edge) {
    let mut graph = self.graph.write().unwrap_or_else(PoisonError::into_inner);
    graph.edges.push(edge);
  }
}

impl GraphStore for InMemoryGraphStore {
  fn snapshot(&self) -> GraphSnapshot {
    self
      .graph
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::node::NodeKind;
  use serde_json::json;

  #[test]
  fn test_in_memory_store() {
    let store = InMemoryGraphStore::default();
    assert!(store.snapshot().nodes.is_empty());

    store.upsert_node(Node::new("a", NodeKind::Primitive { value: json!(1) }));
    store.upsert_node(Node::new("b", NodeKind::Sink));
    store.add_edge(Edge::new("e1", "a", "b"));

    let snapshot = store.snapshot();
    assert_eq!(snapshot.nodes.len(), 2);
    assert_eq!(snapshot.edges.len(), 1);

    store.upsert_node(Node::new("a", NodeKind::Primitive { value: json!(2) }));
    assert_eq!(store.snapshot().nodes.len(), 2);
    assert_eq!(
      store.snapshot().get_node("a").unwrap().kind,
      NodeKind::Primitive { value: json!(2) }
    );

    store.remove_node("a");
    let snapshot = store.snapshot();
    assert_eq!(snapshot.nodes.len(), 1);
    assert!(snapshot.edges.is_empty());
  }

  #[test]
  fn test_snapshot_is_detached() {
    let store = InMemoryGraphStore::default();
    store.upsert_node(Node::new("a", NodeKind::Sink));

    let taken = store.snapshot();
    store.remove_node("a");

    assert_eq!(taken.nodes.len(), 1);
    assert!(store.snapshot().nodes.is_empty());
  }
}
