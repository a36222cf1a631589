use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
  /// Scheduling could not make progress. Lists every node that never reached
  /// in-degree zero, sorted.
  #[error("cycle detected among nodes: {}", node_ids.join(", "))]
  Cycle { node_ids: Vec<String> },
}
