//! A provider-free executor for dry runs.

use async_trait::async_trait;
use weft_config::{DEFAULT_HANDLE, Node, NodeOutput, Payload};

use crate::context::ExecutionContext;
use crate::error::NodeExecutionError;
use crate::executor::NodeExecutor;
use crate::input::{HandleInput, NodeInputs};

/// Forwards inputs to outputs without calling any provider.
///
/// - every input handle is re-emitted on the output handle of the same name;
///   a handle holding several records becomes a `list` payload whose
///   `sources` metadata names the upstream nodes in order
/// - a node without inputs emits its own data on the default handle, typed
///   by the node's type tag
///
/// Useful for checking wiring and scheduling of a workflow before spending
/// provider credits on it.
#[derive(Debug, Clone, Default)]
pub struct PassthroughExecutor;

#[async_trait]
impl NodeExecutor for PassthroughExecutor {
  async fn execute(
    &self,
    node: &Node,
    inputs: &NodeInputs,
    _context: &ExecutionContext,
  ) -> Result<NodeOutput, NodeExecutionError> {
    if inputs.is_empty() {
      let payload = Payload::new(
        node.node_type.clone(),
        serde_json::Value::Object(node.data.clone()),
      );
      return Ok(NodeOutput::from([(DEFAULT_HANDLE.to_string(), payload)]));
    }

    let output = inputs
      .iter()
      .map(|(handle, input)| {
        let payload = match input {
          HandleInput::Single(record) => record.payload.clone(),
          HandleInput::Many(records) => Payload::new(
            "list",
            serde_json::Value::Array(records.iter().map(|r| r.payload.value.clone()).collect()),
          )
          .with_metadata(
            "sources",
            serde_json::Value::Array(
              records
                .iter()
                .map(|r| serde_json::Value::String(r.source_node.clone()))
                .collect(),
            ),
          ),
        };
        (handle.clone(), payload)
      })
      .collect();

    Ok(output)
  }
}
