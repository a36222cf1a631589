//! Layered topological scheduling.
//!
//! Kahn's algorithm, reduced one "generation" at a time: every node whose
//! remaining in-degree is zero joins the current layer, then the layer's
//! outgoing edges are removed. Each layer is therefore the maximal set of
//! nodes that can run concurrently once all earlier layers have finished.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::WorkflowError;
use crate::graph::DependencyGraph;

/// Node ids that may execute concurrently, in node-declaration order.
pub type Layer = Vec<String>;

/// Compute execution layers for every node in `graph`.
///
/// Fails with [`WorkflowError::Cycle`] naming every node that never reaches
/// in-degree zero. Layers already computed are discarded in that case.
pub fn schedule(graph: &DependencyGraph) -> Result<Vec<Layer>, WorkflowError> {
  let mut remaining: HashMap<&str, usize> = graph
    .node_ids()
    .iter()
    .map(|id| (id.as_str(), graph.in_degree(id)))
    .collect();
  let mut visited: HashSet<&str> = HashSet::with_capacity(graph.len());
  let mut layers = Vec::new();

  while visited.len() < graph.len() {
    let layer: Vec<&str> = graph
      .node_ids()
      .iter()
      .map(String::as_str)
      .filter(|id| !visited.contains(id))
      .filter(|id| remaining.get(id).copied().unwrap_or(0) == 0)
      .collect();

    if layer.is_empty() {
      let mut stuck: Vec<String> = graph
        .node_ids()
        .iter()
        .filter(|id| !visited.contains(id.as_str()))
        .cloned()
        .collect();
      stuck.sort();
      debug!(stuck = ?stuck, "scheduling stalled on a cycle");
      return Err(WorkflowError::Cycle { node_ids: stuck });
    }

    for id in &layer {
      visited.insert(*id);
      for dependent in graph.dependents(id) {
        if let Some(degree) = remaining.get_mut(dependent.target_id.as_str()) {
          *degree = degree.saturating_sub(1);
        }
      }
    }

    layers.push(layer.into_iter().map(str::to_string).collect());
  }

  Ok(layers)
}
