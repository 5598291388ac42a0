use serde::{Deserialize, Serialize};

use crate::edge::Edge;
use crate::error::GraphError;
use crate::graph::Graph;
use crate::node::Node;
use crate::scheduler;

/// A point-in-time copy of a graph's nodes and edges.
///
/// A run takes one snapshot at start and only ever reads it, so edits made to
/// the live graph while the run is in flight cannot affect it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
  #[serde(default)]
  pub nodes: Vec<Node>,
  #[serde(default)]
  pub edges: Vec<Edge>,
}

impl GraphSnapshot {
  pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
    Self { nodes, edges }
  }

  /// Build the graph structure for traversal.
  pub fn graph(&self) -> Graph {
    Graph::new(&self.nodes, &self.edges)
  }

  /// Get a node by ID.
  pub fn get_node(&self, node_id: &str) -> Option<&Node> {
    self.nodes.iter().find(|n| n.id == node_id)
  }

  /// Edges targeting `node_id`, in snapshot order.
  pub fn incoming<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
    self.edges.iter().filter(move |e| e.target == node_id)
  }

  /// Topologically sorted nodes. See [`scheduler::order`].
  pub fn execution_order(&self) -> Result<Vec<&Node>, GraphError> {
    scheduler::order(&self.nodes, &self.edges)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_parse_snapshot() {
    let snapshot: GraphSnapshot = serde_json::from_value(json!({
      "nodes": [
        { "id": "p", "type": "primitive", "data": { "value": "a cat" } },
        { "id": "out", "type": "sink" }
      ],
      "edges": [
        { "id": "e1", "source": "p", "target": "out" }
      ]
    }))
    .unwrap();

    assert_eq!(snapshot.nodes.len(), 2);
    assert!(snapshot.get_node("out").is_some());
    assert_eq!(snapshot.incoming("out").count(), 1);
    assert_eq!(snapshot.incoming("p").count(), 0);

    let order: Vec<&str> = snapshot
      .execution_order()
      .unwrap()
      .iter()
      .map(|n| n.id.as_str())
      .collect();
    assert_eq!(order, ["p", "out"]);
  }

  #[test]
  fn test_missing_sections_default_empty() {
    let snapshot: GraphSnapshot = serde_json::from_str("{}").unwrap();
    assert!(snapshot.nodes.is_empty());
    assert!(snapshot.edges.is_empty());
  }
}
