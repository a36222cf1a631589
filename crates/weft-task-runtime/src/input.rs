//! Aggregated node inputs.
//!
//! Each input handle of a node receives zero or more records, one per
//! incoming edge whose source produced something. A handle fed by a single
//! edge holds the record directly; a handle fed by several edges holds them
//! as a list in edge-declaration order:
//!
//! ```json
//! {
//!   "prompt": { "type": "text", "value": "a lighthouse", "sourceNode": "p1", "sourceHandle": "default" },
//!   "reference": [
//!     { "type": "image", "value": "https://...", "sourceNode": "img1", "sourceHandle": "image" },
//!     { "type": "image", "value": "https://...", "sourceNode": "img2", "sourceHandle": "image" }
//!   ]
//! }
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use weft_config::Payload;

/// A payload together with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputRecord {
  #[serde(flatten)]
  pub payload: Payload,
  pub source_node: String,
  pub source_handle: String,
}

/// What arrived on one input handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HandleInput {
  Single(InputRecord),
  Many(Vec<InputRecord>),
}

impl HandleInput {
  /// All records on the handle, in edge order.
  pub fn records(&self) -> &[InputRecord] {
    match self {
      HandleInput::Single(record) => std::slice::from_ref(record),
      HandleInput::Many(records) => records,
    }
  }

  pub fn first(&self) -> Option<&InputRecord> {
    self.records().first()
  }

  pub fn len(&self) -> usize {
    self.records().len()
  }

  pub fn is_empty(&self) -> bool {
    self.records().is_empty()
  }
}

/// Inputs of a node keyed by target handle.
pub type NodeInputs = HashMap<String, HandleInput>;
