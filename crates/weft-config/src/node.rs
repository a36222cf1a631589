use serde::{Deserialize, Serialize};

/// Opaque key-value configuration of a node (prompt, model, seed, ...).
///
/// The engine never inspects it; only the executor for the node's type does.
pub type NodeData = serde_json::Map<String, serde_json::Value>;

/// A single step of a workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
  pub id: String,
  /// Type tag selecting the executor, e.g. "textGeneration" or "imageGeneration".
  #[serde(rename = "type")]
  pub node_type: String,
  #[serde(default)]
  pub data: NodeData,
}

impl Node {
  pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      node_type: node_type.into(),
      data: NodeData::new(),
    }
  }

  /// Builder-style helper to attach a data entry.
  pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
    self.data.insert(key.into(), value);
    self
  }
}
