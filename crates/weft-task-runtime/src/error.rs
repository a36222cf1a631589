//! Node execution errors.

/// Errors an executor can report for a single node.
///
/// These never escape the orchestrator on their own: they are recorded per
/// node and reported through the node-failed notification.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NodeExecutionError {
  /// The executor gave up because the run was cancelled.
  #[error("node execution cancelled")]
  Cancelled,

  /// A required input handle received nothing.
  #[error("missing input on handle '{handle}'")]
  MissingInput { handle: String },

  /// The node's data could not be interpreted.
  #[error("invalid node data: {message}")]
  InvalidData { message: String },

  /// The upstream generation provider rejected or failed the request.
  #[error("provider request failed: {message}")]
  Provider { message: String },

  /// The executor's own deadline elapsed.
  #[error("node timed out after {timeout_ms}ms")]
  Timeout { timeout_ms: u64 },

  /// No executor is registered for the node's type.
  #[error("unsupported node type: {node_type}")]
  UnsupportedType { node_type: String },

  /// The task running the node panicked or was aborted.
  #[error("node task aborted: {message}")]
  Aborted { message: String },

  /// Any other executor-specific failure.
  #[error("{message}")]
  Failed { message: String },
}

impl NodeExecutionError {
  pub fn failed(message: impl Into<String>) -> Self {
    Self::Failed {
      message: message.into(),
    }
  }
}
