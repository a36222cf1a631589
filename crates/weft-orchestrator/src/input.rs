//! Input aggregation.
//!
//! Collects, for one node, the payloads arriving on each of its input
//! handles from upstream nodes that already have an output.
//!
//! # Lookup
//! For an edge `source.sourceHandle -> node.targetHandle`, the payload is the
//! source's output under `sourceHandle`, or under `"default"` when the source
//! did not emit that handle.
//!
//! # Missing sources
//! An edge whose source has no recorded output (not executed, skipped,
//! failed, or missing from the snapshot) contributes nothing. The drop is
//! silent apart from a debug-level event.
//!
//! # Shape
//! A handle fed by one edge gets the record itself; a handle fed by several
//! edges gets a list in edge-declaration order.

use std::collections::HashMap;

use tracing::debug;
use weft_config::{DEFAULT_HANDLE, Edge, Node, NodeOutput};
use weft_task_runtime::{HandleInput, InputRecord, NodeInputs};

/// Resolve the inputs of `node` from the outputs recorded so far.
pub fn resolve_inputs(
  node: &Node,
  edges: &[Edge],
  nodes: &[Node],
  node_outputs: &HashMap<String, NodeOutput>,
) -> NodeInputs {
  // Handles in first-seen order, each with its records in edge order
  let mut grouped: Vec<(String, Vec<InputRecord>)> = Vec::new();

  for edge in edges.iter().filter(|e| e.target == node.id) {
    if !nodes.iter().any(|n| n.id == edge.source) {
      debug!(node_id = %node.id, edge_id = %edge.id, source = %edge.source, "input source not in graph");
      continue;
    }

    let Some(output) = node_outputs.get(&edge.source) else {
      debug!(node_id = %node.id, edge_id = %edge.id, source = %edge.source, "input source has no output");
      continue;
    };

    let Some(payload) = output
      .get(edge.source_handle())
      .or_else(|| output.get(DEFAULT_HANDLE))
    else {
      debug!(
        node_id = %node.id,
        edge_id = %edge.id,
        source = %edge.source,
        source_handle = %edge.source_handle(),
        "input source emitted nothing on handle"
      );
      continue;
    };

    let record = InputRecord {
      payload: payload.clone(),
      source_node: edge.source.clone(),
      source_handle: edge.source_handle().to_string(),
    };

    let target_handle = edge.target_handle();
    match grouped.iter_mut().find(|(handle, _)| handle == target_handle) {
      Some((_, records)) => records.push(record),
      None => grouped.push((target_handle.to_string(), vec![record])),
    }
  }

  grouped
    .into_iter()
    .map(|(handle, mut records)| {
      let input = if records.len() == 1 {
        HandleInput::Single(records.remove(0))
      } else {
        HandleInput::Many(records)
      };
      (handle, input)
    })
    .collect()
}
