//! Error types for workflow runs.

use thiserror::Error;
use weft_workflow::WorkflowError;

/// Errors that end a run without a result.
///
/// Node failures under a partial policy are not errors: they are reported in
/// [`RunResult::node_errors`](crate::RunResult::node_errors).
#[derive(Debug, Error)]
pub enum ExecutionError {
  /// The scoped graph could not be scheduled. Nothing was executed.
  #[error(transparent)]
  Graph(#[from] WorkflowError),

  /// A node failed and partial completion was not allowed.
  ///
  /// Carries the first failure of the layer that stopped the run; every
  /// failure of that layer is listed in `failed_node_ids`.
  #[error("node '{node_id}' failed: {message}")]
  Aborted {
    node_id: String,
    message: String,
    failed_node_ids: Vec<String>,
  },

  /// The run was cancelled between layers.
  #[error("workflow execution cancelled")]
  Cancelled,
}
