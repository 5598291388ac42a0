//! Input resolution.
//!
//! A node's inputs are built from three layers, lowest precedence first:
//!
//! 1. the declared defaults of its configuration
//! 2. values carried by incoming edges, one slot per edge
//! 3. its locally set `inputValues`
//!
//! A slot keeps the position of its first appearance even when a later layer
//! overwrites it, which gives combine nodes a stable "slot order".

use serde_json::{Map, Value};
use studioflow_graph::{Edge, Node, NodeKind};
use studioflow_provider::primary_payload;

/// Resolve the inputs of `node` against the results recorded so far.
///
/// Edges whose source has no recorded result leave their slot untouched.
/// Composite results are reduced to their primary payload (`url`) before
/// being forwarded, except into a sink, which reports the full result.
pub fn resolve_inputs(node: &Node, edges: &[Edge], results: &Map<String, Value>) -> Map<String, Value> {
  let mut inputs = node.defaults().cloned().unwrap_or_default();
  let keep_whole = matches!(node.kind, NodeKind::Sink);

  for edge in edges.iter().filter(|e| e.target == node.id) {
    if let Some(result) = results.get(&edge.source) {
      let value = if keep_whole {
        result.clone()
      } else {
        primary_payload(result)
      };
      inputs.insert(edge.target_slot().to_string(), value);
    }
  }

  for (slot, value) in &node.input_values {
    inputs.insert(slot.clone(), value.clone());
  }

  inputs
}
