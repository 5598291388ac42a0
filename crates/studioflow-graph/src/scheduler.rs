//! Execution ordering.
//!
//! Kahn's algorithm over the snapshot with a FIFO ready queue. Nodes ready
//! from the start are queued in snapshot order; every other node is queued
//! when its last incoming edge is released. Runs are deterministic for a
//! given snapshot.

use std::collections::VecDeque;

use crate::edge::Edge;
use crate::error::GraphError;
use crate::graph::Graph;
use crate::node::Node;

/// Order `nodes` so that every edge points from an earlier to a later node.
///
/// Edges whose endpoints are missing from `nodes` are ignored. Fails with
/// [`GraphError::Cycle`] when the graph is not a DAG, and with
/// [`GraphError::DuplicateNode`] when two nodes share an id.
pub fn order<'a>(nodes: &'a [Node], edges: &[Edge]) -> Result<Vec<&'a Node>, GraphError> {
  let graph = Graph::new(nodes, edges);
  if let Some(id) = graph.duplicate_ids().first() {
    return Err(GraphError::DuplicateNode(id.clone()));
  }

  let mut in_degree = graph.in_degrees();
  let mut ready: VecDeque<usize> = in_degree
    .iter()
    .enumerate()
    .filter(|(_, degree)| **degree == 0)
    .map(|(position, _)| position)
    .collect();

  let mut ordered = Vec::with_capacity(nodes.len());
  while let Some(position) = ready.pop_front() {
    ordered.push(&nodes[position]);

    for &next in graph.successors(position) {
      in_degree[next] -= 1;
      if in_degree[next] == 0 {
        ready.push_back(next);
      }
    }
  }

  if ordered.len() < nodes.len() {
    let remaining = in_degree
      .iter()
      .enumerate()
      .filter(|(_, degree)| **degree > 0)
      .map(|(position, _)| nodes[position].id.clone())
      .collect();
    return Err(GraphError::Cycle { nodes: remaining });
  }

  Ok(ordered)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::node::NodeKind;

  fn node(id: &str) -> Node {
    Node::new(id, NodeKind::Sink)
  }

  fn edge(from: &str, to: &str) -> Edge {
    Edge::new(format!("{from}->{to}"), from, to)
  }

  fn ids(ordered: &[&Node]) -> Vec<String> {
    ordered.iter().map(|n| n.id.clone()).collect()
  }

  fn assert_respects_edges(ordered: &[&Node], edges: &[Edge]) {
    let position = |id: &str| ordered.iter().position(|n| n.id == id);
    for e in edges {
      if let (Some(from), Some(to)) = (position(&e.source), position(&e.target)) {
        assert!(from < to, "edge {} -> {} violated", e.source, e.target);
      }
    }
  }

  #[test]
  fn test_linear_chain() {
    let nodes = vec![node("c"), node("b"), node("a")];
    let edges = vec![edge("a", "b"), edge("b", "c")];
    let ordered = order(&nodes, &edges).unwrap();
    assert_eq!(ids(&ordered), ["a", "b", "c"]);
  }

  #[test]
  fn test_diamond_respects_every_edge() {
    let nodes = vec![node("sink"), node("left"), node("right"), node("src")];
    let edges = vec![
      edge("src", "left"),
      edge("src", "right"),
      edge("left", "sink"),
      edge("right", "sink"),
    ];
    let ordered = order(&nodes, &edges).unwrap();
    assert_eq!(ordered.len(), 4);
    assert_respects_edges(&ordered, &edges);
    // src -> left is listed before src -> right, so left is queued first.
    assert_eq!(ids(&ordered), ["src", "left", "right", "sink"]);
  }

  #[test]
  fn test_ready_queue_is_fifo() {
    // d sits before b and c in the snapshot, but it is only released after a,
    // behind b and c which were ready from the start.
    let nodes = vec![node("a"), node("d"), node("b"), node("c")];
    let edges = vec![edge("a", "d")];
    let ordered = order(&nodes, &edges).unwrap();
    assert_eq!(ids(&ordered), ["a", "b", "c", "d"]);

    // Successors are queued in edge order.
    let nodes = vec![node("src"), node("y"), node("x"), node("lone")];
    let edges = vec![edge("src", "x"), edge("src", "y")];
    let ordered = order(&nodes, &edges).unwrap();
    assert_eq!(ids(&ordered), ["src", "lone", "x", "y"]);

    let nodes = vec![node("a"), node("b"), node("c"), node("d")];
    let ordered = order(&nodes, &[]).unwrap();
    assert_eq!(ids(&ordered), ["a", "b", "c", "d"]);
  }

  #[test]
  fn test_isolated_nodes_are_valid() {
    let nodes = vec![node("x"), node("y")];
    let ordered = order(&nodes, &[]).unwrap();
    assert_eq!(ids(&ordered), ["x", "y"]);
  }

  #[test]
  fn test_empty_graph() {
    let ordered = order(&[], &[]).unwrap();
    assert!(ordered.is_empty());
  }

  #[test]
  fn test_cycle_detected() {
    let nodes = vec![node("start"), node("a"), node("b"), node("after")];
    let edges = vec![
      edge("start", "a"),
      edge("a", "b"),
      edge("b", "a"),
      edge("b", "after"),
    ];
    let err = order(&nodes, &edges).unwrap_err();
    assert_eq!(
      err,
      GraphError::Cycle {
        nodes: vec!["a".to_string(), "b".to_string(), "after".to_string()]
      }
    );
  }

  #[test]
  fn test_self_loop_is_cycle() {
    let nodes = vec![node("a")];
    let err = order(&nodes, &[edge("a", "a")]).unwrap_err();
    assert!(matches!(err, GraphError::Cycle { .. }));
  }

  #[test]
  fn test_dangling_edges_ignored() {
    let nodes = vec![node("a"), node("b")];
    let edges = vec![edge("ghost", "a"), edge("a", "b"), edge("b", "phantom")];
    let ordered = order(&nodes, &edges).unwrap();
    assert_eq!(ids(&ordered), ["a", "b"]);
  }

  #[test]
  fn test_parallel_edges_counted() {
    let nodes = vec![node("a"), node("b")];
    let edges = vec![
      edge("a", "b"),
      Edge::new("second", "a", "b").with_target_handle("other"),
    ];
    let ordered = order(&nodes, &edges).unwrap();
    assert_eq!(ids(&ordered), ["a", "b"]);
  }

  #[test]
  fn test_duplicate_ids_rejected() {
    let nodes = vec![node("a"), node("a")];
    let err = order(&nodes, &[]).unwrap_err();
    assert_eq!(err, GraphError::DuplicateNode("a".to_string()));
  }

  #[test]
  fn test_wide_dag_is_permutation() {
    // A layered DAG: every node in layer n feeds every node in layer n + 1.
    let layers = [vec!["a1", "a2"], vec!["b1", "b2", "b3"], vec!["c1"]];
    let mut nodes = Vec::new();
    for layer in layers.iter().rev() {
      for id in layer {
        nodes.push(node(id));
      }
    }
    let mut edges = Vec::new();
    for pair in layers.windows(2) {
      for from in &pair[0] {
        for to in &pair[1] {
          edges.push(edge(from, to));
        }
      }
    }

    let ordered = order(&nodes, &edges).unwrap();
    let mut sorted = ids(&ordered);
    sorted.sort();
    assert_eq!(sorted, ["a1", "a2", "b1", "b2", "b3", "c1"]);
    assert_respects_edges(&ordered, &edges);
  }
}
