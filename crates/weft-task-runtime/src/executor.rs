//! The node execution contract.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use weft_config::{Node, NodeOutput};

use crate::context::ExecutionContext;
use crate::error::NodeExecutionError;
use crate::input::NodeInputs;

/// Executes a single node's domain logic.
///
/// Implementations are shared across the concurrent tasks of a layer, so they
/// must be `Send + Sync`. Long-running work (provider calls, polling) should
/// enforce its own timeout and report it as [`NodeExecutionError::Timeout`].
#[async_trait]
pub trait NodeExecutor: Send + Sync {
  async fn execute(
    &self,
    node: &Node,
    inputs: &NodeInputs,
    context: &ExecutionContext,
  ) -> Result<NodeOutput, NodeExecutionError>;
}

/// Routes each node to the executor registered for its type tag.
#[derive(Default, Clone)]
pub struct ExecutorRegistry {
  executors: HashMap<String, Arc<dyn NodeExecutor>>,
}

impl ExecutorRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register an executor for a node type, replacing any previous one.
  pub fn register(
    &mut self,
    node_type: impl Into<String>,
    executor: Arc<dyn NodeExecutor>,
  ) -> &mut Self {
    self.executors.insert(node_type.into(), executor);
    self
  }

  pub fn get(&self, node_type: &str) -> Option<&Arc<dyn NodeExecutor>> {
    self.executors.get(node_type)
  }

  pub fn node_types(&self) -> impl Iterator<Item = &str> {
    self.executors.keys().map(String::as_str)
  }
}

#[async_trait]
impl NodeExecutor for ExecutorRegistry {
  async fn execute(
    &self,
    node: &Node,
    inputs: &NodeInputs,
    context: &ExecutionContext,
  ) -> Result<NodeOutput, NodeExecutionError> {
    let Some(executor) = self.get(&node.node_type) else {
      debug!(
        node_id = %node.id,
        node_type = %node.node_type,
        registered = ?self.node_types().collect::<Vec<_>>(),
        "no executor registered for node type"
      );
      return Err(NodeExecutionError::UnsupportedType {
        node_type: node.node_type.clone(),
      });
    };

    debug!(node_id = %node.id, node_type = %node.node_type, "dispatching to registered executor");
    executor.execute(node, inputs, context).await
  }
}
