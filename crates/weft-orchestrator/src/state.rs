//! Resumable state of the last unsuccessful run.

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use weft_config::NodeOutput;

/// What a later `resume` run needs from an unsuccessful one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionState {
  /// Outputs of scoped nodes that completed (or were seeded) before the run ended.
  pub node_outputs: HashMap<String, NodeOutput>,
  /// The exact scope of the run, reused verbatim on resume. `None` means
  /// there is nothing to resume.
  pub scope_node_ids: Option<BTreeSet<String>>,
  /// Nodes that failed in that run.
  pub failed_node_ids: BTreeSet<String>,
}

impl ExecutionState {
  /// Scope to reuse on resume, if one was persisted and is non-empty.
  pub fn resumable_scope(&self) -> Option<&BTreeSet<String>> {
    self.scope_node_ids.as_ref().filter(|scope| !scope.is_empty())
  }

  pub fn is_empty(&self) -> bool {
    self.node_outputs.is_empty() && self.scope_node_ids.is_none() && self.failed_node_ids.is_empty()
  }
}

/// Single-slot store for [`ExecutionState`].
///
/// Every run overwrites the slot when it finishes; no earlier states are kept.
#[derive(Debug, Default)]
pub struct ExecutionStateStore {
  slot: RwLock<ExecutionState>,
}

impl ExecutionStateStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// A copy of the current state.
  pub fn snapshot(&self) -> ExecutionState {
    self.slot.read().unwrap_or_else(|e| e.into_inner()).clone()
  }

  /// Overwrite the slot.
  pub fn replace(&self, state: ExecutionState) {
    *self.slot.write().unwrap_or_else(|e| e.into_inner()) = state;
  }

  /// Reset the slot to the empty state.
  pub fn clear(&self) {
    self.replace(ExecutionState::default());
  }

  /// Whether a `resume` run would reuse a persisted scope.
  pub fn is_resumable(&self) -> bool {
    self
      .slot
      .read()
      .unwrap_or_else(|e| e.into_inner())
      .resumable_scope()
      .is_some()
  }
}
