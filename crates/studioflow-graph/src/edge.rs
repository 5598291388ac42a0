use serde::{Deserialize, Serialize};

use crate::node::DEFAULT_INPUT_SLOT;

/// A directed dependency from one node's output to another node's input slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
  #[serde(default)]
  pub id: String,
  pub source: String,
  pub target: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_handle: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub target_handle: Option<String>,
}

impl Edge {
  pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      source: source.into(),
      target: target.into(),
      source_handle: None,
      target_handle: None,
    }
  }

  pub fn with_target_handle(mut self, handle: impl Into<String>) -> Self {
    self.target_handle = Some(handle.into());
    self
  }

  /// Input slot this edge feeds. An absent or empty handle means [`DEFAULT_INPUT_SLOT`].
  pub fn target_slot(&self) -> &str {
    match self.target_handle.as_deref() {
      Some(handle) if !handle.is_empty() => handle,
      _ => DEFAULT_INPUT_SLOT,
    }
  }
}
