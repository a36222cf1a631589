use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A typed value emitted on a node's output handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
  /// Media kind of the value, e.g. "text", "image", "video", "audio".
  #[serde(rename = "type")]
  pub kind: String,
  pub value: serde_json::Value,
  #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
  pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Payload {
  pub fn new(kind: impl Into<String>, value: serde_json::Value) -> Self {
    Self {
      kind: kind.into(),
      value,
      metadata: serde_json::Map::new(),
    }
  }

  pub fn text(value: impl Into<String>) -> Self {
    Self::new("text", serde_json::Value::String(value.into()))
  }

  pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
    self.metadata.insert(key.into(), value);
    self
  }
}

/// Everything a node produced, keyed by output handle name.
pub type NodeOutput = HashMap<String, Payload>;
