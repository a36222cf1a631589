//! Weft Config
//!
//! This crate contains the serializable graph snapshot types for Weft.
//! A snapshot is what the canvas hands to the engine when a run starts:
//! an ordered node list and an ordered edge list, plus the payloads that
//! flow between node handles once nodes have executed.
//!
//! Snapshots are exchanged as camelCase JSON. Fields the engine does not
//! care about (canvas positions, selection state, etc.) are ignored on load.

mod edge;
mod node;
mod payload;
mod workflow;

pub use edge::{DEFAULT_HANDLE, Edge};
pub use node::{Node, NodeData};
pub use payload::{NodeOutput, Payload};
pub use workflow::WorkflowDef;
