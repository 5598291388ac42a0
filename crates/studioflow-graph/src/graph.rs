use std::collections::HashMap;

use tracing::debug;

use crate::edge::Edge;
use crate::node::Node;

/// Graph structure for traversal and analysis.
///
/// Nodes are addressed by their position in the snapshot so that callers can
/// break ties by snapshot order. Edges whose endpoints are not in the snapshot
/// are dropped and remembered in [`Graph::dropped_edges`].
#[derive(Debug, Clone)]
pub struct Graph {
  /// node_id -> first snapshot index carrying that id.
  index: HashMap<String, usize>,
  /// Adjacency list: index -> downstream indices (one entry per edge).
  adjacency: Vec<Vec<usize>>,
  /// Reverse adjacency: index -> upstream indices (one entry per edge).
  reverse_adjacency: Vec<Vec<usize>>,
  /// Ids of edges referencing nodes missing from the snapshot.
  dropped_edges: Vec<String>,
  /// Ids appearing more than once in the snapshot.
  duplicate_ids: Vec<String>,
}

impl Graph {
  /// Build a graph from nodes and edges.
  pub fn new(nodes: &[Node], edges: &[Edge]) -> Self {
    let mut index = HashMap::with_capacity(nodes.len());
    let mut duplicate_ids = Vec::new();

    for (position, node) in nodes.iter().enumerate() {
      if index.contains_key(&node.id) {
        if !duplicate_ids.contains(&node.id) {
          duplicate_ids.push(node.id.clone());
        }
      } else {
        index.insert(node.id.clone(), position);
      }
    }

    let mut adjacency = vec![Vec::new(); nodes.len()];
    let mut reverse_adjacency = vec![Vec::new(); nodes.len()];
    let mut dropped_edges = Vec::new();

    for edge in edges {
      match (index.get(&edge.source), index.get(&edge.target)) {
        (Some(&from), Some(&to)) => {
          adjacency[from].push(to);
          reverse_adjacency[to].push(from);
        }
        _ => {
          debug!(
            edge_id = %edge.id,
            source = %edge.source,
            target = %edge.target,
            "dropping edge with unknown endpoint"
          );
          dropped_edges.push(edge.id.clone());
        }
      }
    }

    Self {
      index,
      adjacency,
      reverse_adjacency,
      dropped_edges,
      duplicate_ids,
    }
  }

  /// Snapshot index of a node id.
  pub fn position(&self, node_id: &str) -> Option<usize> {
    self.index.get(node_id).copied()
  }

  /// Downstream indices of the node at `position`.
  pub fn successors(&self, position: usize) -> &[usize] {
    self
      .adjacency
      .get(position)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Incoming edge count per node, in snapshot order.
  pub fn in_degrees(&self) -> Vec<usize> {
    self.reverse_adjacency.iter().map(Vec::len).collect()
  }

  /// Whether any surviving edge touches the node.
  pub fn is_connected(&self, node_id: &str) -> bool {
    self.position(node_id).is_some_and(|position| {
      !self.adjacency[position].is_empty() || !self.reverse_adjacency[position].is_empty()
    })
  }

  /// Ids of edges that were dropped because an endpoint is missing.
  pub fn dropped_edges(&self) -> &[String] {
    &self.dropped_edges
  }

  /// Node ids that occur more than once.
  pub fn duplicate_ids(&self) -> &[String] {
    &self.duplicate_ids
  }
}
