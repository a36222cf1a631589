use serde::{Deserialize, Serialize};

/// Handle name used when an edge or an output does not name one.
pub const DEFAULT_HANDLE: &str = "default";

/// A directed connection from an output handle of one node to an input
/// handle of another.
///
/// Handles are optional on the wire (the canvas sends `null` for nodes with a
/// single port); the accessors fall back to [`DEFAULT_HANDLE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
  pub id: String,
  pub source: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_handle: Option<String>,
  pub target: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub target_handle: Option<String>,
}

impl Edge {
  /// Create an edge between the default handles of two nodes.
  pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      source: source.into(),
      source_handle: None,
      target: target.into(),
      target_handle: None,
    }
  }

  /// Create an edge between named handles.
  pub fn between(
    id: impl Into<String>,
    source: impl Into<String>,
    source_handle: impl Into<String>,
    target: impl Into<String>,
    target_handle: impl Into<String>,
  ) -> Self {
    Self {
      id: id.into(),
      source: source.into(),
      source_handle: Some(source_handle.into()),
      target: target.into(),
      target_handle: Some(target_handle.into()),
    }
  }

  pub fn source_handle(&self) -> &str {
    self.source_handle.as_deref().unwrap_or(DEFAULT_HANDLE)
  }

  pub fn target_handle(&self) -> &str {
    self.target_handle.as_deref().unwrap_or(DEFAULT_HANDLE)
  }
}
