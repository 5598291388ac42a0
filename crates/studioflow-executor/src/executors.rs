//! Per-kind node behavior.

use serde_json::{Map, Value, json};
use studioflow_graph::{CombineMode, DEFAULT_INPUT_SLOT, InvocationConfig, InvocationMode, Node, NodeKind};
use studioflow_provider::{InvocationRequest, PollProgress, ProviderAdapter, normalize_output};
use tokio_util::sync::CancellationToken;

use crate::error::ExecutionError;

/// Runs a single node given its resolved inputs.
#[derive(Clone)]
pub struct NodeExecutor {
  adapter: ProviderAdapter,
  default_mode: InvocationMode,
}

impl NodeExecutor {
  pub fn new(adapter: ProviderAdapter, default_mode: InvocationMode) -> Self {
    Self {
      adapter,
      default_mode,
    }
  }

  /// Produce the node's output.
  ///
  /// Only invocation nodes suspend; every other kind completes immediately.
  /// Unknown kinds pass their first input through and never fail.
  pub async fn execute<F>(
    &self,
    node: &Node,
    inputs: Map<String, Value>,
    on_progress: F,
    cancel: &CancellationToken,
  ) -> Result<Value, ExecutionError>
  where
    F: Fn(&PollProgress) + Send + Sync,
  {
    match &node.kind {
      NodeKind::Primitive { value } => Ok(value.clone()),
      NodeKind::Invocation(config) => self.invoke(node, config, inputs, on_progress, cancel).await,
      NodeKind::Combine { mode } => Ok(combine(mode, inputs)),
      NodeKind::Sink => Ok(sink(inputs)),
      NodeKind::Annotation { .. } => Ok(Value::Null),
      NodeKind::Other { .. } => Ok(first_value(inputs)),
    }
  }

  async fn invoke<F>(
    &self,
    node: &Node,
    config: &InvocationConfig,
    inputs: Map<String, Value>,
    on_progress: F,
    cancel: &CancellationToken,
  ) -> Result<Value, ExecutionError>
  where
    F: Fn(&PollProgress) + Send + Sync,
  {
    let model_id = config.model_id.trim();
    if model_id.is_empty() {
      return Err(ExecutionError::MissingModel {
        node_id: node.id.clone(),
      });
    }

    let mode = config.mode.unwrap_or(self.default_mode);
    let raw = self
      .adapter
      .invoke(InvocationRequest::new(model_id, inputs), mode, on_progress, cancel)
      .await
      .map_err(|e| ExecutionError::from_provider(&node.id, e))?;

    Ok(normalize_output(raw, config.output_type.as_deref()))
  }
}

/// Merge resolved inputs according to `mode`, in slot order.
pub fn combine(mode: &CombineMode, inputs: Map<String, Value>) -> Value {
  match mode {
    CombineMode::Text => {
      let parts: Vec<String> = inputs
        .into_iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(_, v)| match v {
          Value::String(s) => s,
          other => other.to_string(),
        })
        .collect();
      Value::String(parts.join(" "))
    }
    CombineMode::List => {
      json!({ "type": "list", "items": inputs.into_iter().map(|(_, v)| v).collect::<Vec<_>>() })
    }
    CombineMode::ImageGrid => {
      json!({ "type": "image-grid", "images": inputs.into_iter().map(|(_, v)| v).collect::<Vec<_>>() })
    }
    CombineMode::Unknown(_) => first_value(inputs),
  }
}

fn sink(mut inputs: Map<String, Value>) -> Value {
  match inputs.remove(DEFAULT_INPUT_SLOT) {
    Some(value) => value,
    None => first_value(inputs),
  }
}

fn first_value(inputs: Map<String, Value>) -> Value {
  inputs.into_iter().next().map(|(_, v)| v).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn slots(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
  }

  #[test]
  fn test_combine_text() {
    let inputs = slots(json!({ "a": "a", "b": "b", "c": "c" }));
    assert_eq!(combine(&CombineMode::Text, inputs), json!("a b c"));

    let inputs = slots(json!({ "a": "seed", "b": 42, "c": null, "d": true }));
    assert_eq!(combine(&CombineMode::Text, inputs), json!("seed 42 true"));

    assert_eq!(combine(&CombineMode::Text, Map::new()), json!(""));
  }

  #[test]
  fn test_combine_composites() {
    let inputs = slots(json!({ "first": "x.png", "second": "y.png" }));
    assert_eq!(
      combine(&CombineMode::ImageGrid, inputs.clone()),
      json!({ "type": "image-grid", "images": ["x.png", "y.png"] })
    );
    assert_eq!(
      combine(&CombineMode::List, inputs),
      json!({ "type": "list", "items": ["x.png", "y.png"] })
    );
  }

  #[test]
  fn test_combine_unknown_mode_forwards_first() {
    let mode = CombineMode::Unknown("collage".to_string());
    assert_eq!(combine(&mode, slots(json!({ "b": 2, "a": 1 }))), json!(2));
    assert_eq!(combine(&mode, Map::new()), Value::Null);
  }

  #[test]
  fn test_sink() {
    assert_eq!(sink(slots(json!({ "other": 1, "input": 2 }))), json!(2));
    assert_eq!(sink(slots(json!({ "other": 1 }))), json!(1));
    assert_eq!(sink(Map::new()), Value::Null);
  }
}
