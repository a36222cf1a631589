use serde::{Deserialize, Serialize};

use crate::edge::Edge;
use crate::node::Node;

/// A graph snapshot: read-only for the duration of a run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDef {
  pub workflow_id: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub nodes: Vec<Node>,
  #[serde(default)]
  pub edges: Vec<Edge>,
}

impl WorkflowDef {
  pub fn new(workflow_id: impl Into<String>, nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
    Self {
      workflow_id: workflow_id.into(),
      name: String::new(),
      nodes,
      edges,
    }
  }
}
