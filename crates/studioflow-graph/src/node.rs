use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Slot name used when an edge does not name a target handle.
pub const DEFAULT_INPUT_SLOT: &str = "input";

/// A unit of computation in a graph snapshot.
///
/// On the wire a node is `{"id", "type", "data", "inputValues", "label"}`.
/// The `type` string selects a [`NodeKind`]; unrecognized types deserialize
/// to [`NodeKind::Other`] so that graphs authored with newer node kinds still
/// load and run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNode", into = "RawNode")]
pub struct Node {
  pub id: String,
  pub kind: NodeKind,
  /// Locally configured input values, keyed by slot name.
  pub input_values: Map<String, Value>,
  pub label: Option<String>,
}

impl Node {
  pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
    Self {
      id: id.into(),
      kind,
      input_values: Map::new(),
      label: None,
    }
  }

  pub fn with_label(mut self, label: impl Into<String>) -> Self {
    self.label = Some(label.into());
    self
  }

  pub fn with_input_value(mut self, slot: impl Into<String>, value: Value) -> Self {
    self.input_values.insert(slot.into(), value);
    self
  }

  /// Label if set, otherwise the node id.
  pub fn display_name(&self) -> &str {
    self.label.as_deref().unwrap_or(&self.id)
  }

  /// Declared per-input defaults from the node's configuration.
  pub fn defaults(&self) -> Option<&Map<String, Value>> {
    match &self.kind {
      NodeKind::Invocation(config) => Some(&config.defaults),
      _ => None,
    }
  }

  pub fn is_annotation(&self) -> bool {
    matches!(self.kind, NodeKind::Annotation { .. })
  }
}

/// The closed set of node kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
  /// Emits a literal value.
  Primitive { value: Value },
  /// Calls an external model.
  Invocation(InvocationConfig),
  /// Merges its resolved inputs.
  Combine { mode: CombineMode },
  /// Terminal output marker; forwards its single input.
  Sink,
  /// Canvas note. Never executed.
  Annotation { data: Value },
  /// Any type this build does not know. Runs as a pass-through.
  Other { type_name: String, data: Value },
}

impl NodeKind {
  /// Canonical wire name of the kind.
  pub fn type_name(&self) -> &str {
    match self {
      NodeKind::Primitive { .. } => "primitive",
      NodeKind::Invocation(_) => "invocation",
      NodeKind::Combine { .. } => "combine",
      NodeKind::Sink => "sink",
      NodeKind::Annotation { .. } => "annotation",
      NodeKind::Other { type_name, .. } => type_name,
    }
  }
}

/// Configuration of an invocation node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationConfig {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub provider: Option<String>,
  #[serde(default, alias = "model_id")]
  pub model_id: String,
  #[serde(default, skip_serializing_if = "Map::is_empty")]
  pub defaults: Map<String, Value>,
  /// Overrides the adapter's default invocation mode.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub mode: Option<InvocationMode>,
  /// Media type assumed for a bare `url` response (`image`, `video`, `audio`).
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub output_type: Option<String>,
}

impl InvocationConfig {
  pub fn new(model_id: impl Into<String>) -> Self {
    Self {
      model_id: model_id.into(),
      ..Self::default()
    }
  }
}

/// How an external model is invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationMode {
  /// One request/response round trip.
  Sync,
  /// Submit a job, then poll its status.
  #[default]
  Queue,
}

/// Merge strategy of a combine node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CombineMode {
  /// Join values with a single space.
  Text,
  /// Wrap values in a list composite.
  List,
  /// Wrap values in an image-grid composite.
  ImageGrid,
  /// Anything else; the combine node forwards its first value.
  Unknown(String),
}

impl CombineMode {
  pub fn as_str(&self) -> &str {
    match self {
      CombineMode::Text => "text",
      CombineMode::List => "list",
      CombineMode::ImageGrid => "images",
      CombineMode::Unknown(mode) => mode,
    }
  }
}

impl From<String> for CombineMode {
  fn from(mode: String) -> Self {
    match mode.as_str() {
      "text" => CombineMode::Text,
      "list" => CombineMode::List,
      "images" | "image-grid" | "grid" => CombineMode::ImageGrid,
      _ => CombineMode::Unknown(mode),
    }
  }
}

impl From<CombineMode> for String {
  fn from(mode: CombineMode) -> Self {
    match mode {
      CombineMode::Unknown(mode) => mode,
      other => other.as_str().to_string(),
    }
  }
}

/// Wire shape of a node.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNode {
  id: String,
  #[serde(rename = "type")]
  type_name: String,
  #[serde(default, skip_serializing_if = "Value::is_null")]
  data: Value,
  #[serde(default, skip_serializing_if = "Map::is_empty")]
  input_values: Map<String, Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  label: Option<String>,
}

#[derive(Deserialize)]
struct PrimitiveData {
  #[serde(default)]
  value: Value,
}

#[derive(Deserialize)]
struct CombineData {
  #[serde(default)]
  mode: String,
}

impl TryFrom<RawNode> for Node {
  type Error = serde_json::Error;

  fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
    // The authoring surface keeps label and input values under `data`.
    let label = raw.label.or_else(|| {
      raw
        .data
        .get("label")
        .and_then(Value::as_str)
        .map(str::to_string)
    });
    let input_values = if raw.input_values.is_empty() {
      raw
        .data
        .get("inputValues")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
    } else {
      raw.input_values
    };

    let data = if raw.data.is_null() {
      Value::Object(Map::new())
    } else {
      raw.data
    };

    let kind = match raw.type_name.as_str() {
      "primitive" | "primitiveNode" => {
        let PrimitiveData { value } = serde_json::from_value(data)?;
        NodeKind::Primitive { value }
      }
      "invocation" | "workflowNode" => NodeKind::Invocation(serde_json::from_value(data)?),
      "combine" | "combineNode" => {
        let CombineData { mode } = serde_json::from_value(data)?;
        NodeKind::Combine { mode: mode.into() }
      }
      "sink" | "sinkNode" | "outputNode" => NodeKind::Sink,
      "annotation" | "commentNode" | "noteNode" => NodeKind::Annotation { data },
      _ => NodeKind::Other {
        type_name: raw.type_name,
        data,
      },
    };

    Ok(Node {
      id: raw.id,
      kind,
      input_values,
      label,
    })
  }
}

impl From<Node> for RawNode {
  fn from(node: Node) -> Self {
    let type_name = node.kind.type_name().to_string();
    let data = match node.kind {
      NodeKind::Primitive { value } => serde_json::json!({ "value": value }),
      NodeKind::Invocation(config) => serde_json::to_value(config).unwrap_or_default(),
      NodeKind::Combine { mode } => serde_json::json!({ "mode": String::from(mode) }),
      NodeKind::Sink => Value::Null,
      NodeKind::Annotation { data } | NodeKind::Other { data, .. } => data,
    };

    RawNode {
      id: node.id,
      type_name,
      data,
      input_values: node.input_values,
      label: node.label,
    }
  }
}
