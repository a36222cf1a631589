//! Run results.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use weft_config::NodeOutput;

/// How the node set of a run was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
  /// Every node of the graph.
  Full,
  /// Explicit targets plus their ancestors.
  Targeted,
  /// The scope persisted by the run being resumed.
  Resumed,
}

/// The node set a run operates on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunScope {
  pub kind: ScopeKind,
  pub node_ids: BTreeSet<String>,
}

impl RunScope {
  pub fn contains(&self, node_id: &str) -> bool {
    self.node_ids.contains(node_id)
  }

  pub fn len(&self) -> usize {
    self.node_ids.len()
  }

  pub fn is_empty(&self) -> bool {
    self.node_ids.is_empty()
  }
}

/// Terminal state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
  /// Every scoped node has an output or was skipped, and nothing failed.
  Completed,
  /// All layers ran but some nodes failed.
  PartiallyCompleted,
  /// A node failure stopped the run before its last layer.
  Failed,
  /// The caller cancelled the run between layers.
  Cancelled,
}

impl RunStatus {
  pub fn is_success(self) -> bool {
    self == RunStatus::Completed
  }
}

/// Where a run is in its lifecycle.
///
/// Reported on `trace` events as the run moves through scoping, scheduling
/// and its layers to a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
  Scoping,
  Scheduling,
  ExecutingLayer { index: usize },
  Finished(RunStatus),
}

impl RunPhase {
  pub fn is_terminal(self) -> bool {
    matches!(self, RunPhase::Finished(_))
  }
}

impl From<RunStatus> for RunPhase {
  fn from(status: RunStatus) -> Self {
    RunPhase::Finished(status)
  }
}

impl fmt::Display for RunPhase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RunPhase::Scoping => write!(f, "scoping"),
      RunPhase::Scheduling => write!(f, "scheduling"),
      RunPhase::ExecutingLayer { index } => write!(f, "executing_layer({index})"),
      RunPhase::Finished(RunStatus::Completed) => write!(f, "completed"),
      RunPhase::Finished(RunStatus::PartiallyCompleted) => write!(f, "partially_completed"),
      RunPhase::Finished(RunStatus::Failed) => write!(f, "failed"),
      RunPhase::Finished(RunStatus::Cancelled) => write!(f, "cancelled"),
    }
  }
}

/// Result of a run that reached its last layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
  pub run_id: String,
  pub success: bool,
  pub status: RunStatus,
  pub workflow_id: String,
  pub duration_ms: u64,
  /// Outputs of every scoped node that has one, cached or freshly executed.
  pub node_outputs: HashMap<String, NodeOutput>,
  /// Error message per failed node; `None` when nothing failed.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub node_errors: Option<HashMap<String, String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  /// Nodes executed successfully by this run (cached nodes excluded).
  pub completed_count: usize,
  pub scope: RunScope,
}
