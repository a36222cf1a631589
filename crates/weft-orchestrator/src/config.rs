//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

use crate::history::DEFAULT_HISTORY_CAPACITY;

/// Configuration for the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OrchestratorConfig {
  /// Maximum number of run summaries kept in the history log.
  pub history_capacity: usize,
}

impl Default for OrchestratorConfig {
  fn default() -> Self {
    Self {
      history_capacity: DEFAULT_HISTORY_CAPACITY,
    }
  }
}
