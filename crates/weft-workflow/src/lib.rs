//! Weft Workflow
//!
//! This crate turns a graph snapshot into something the orchestrator can
//! execute:
//! - [`DependencyGraph`] indexes edges by source (with handle names), counts
//!   in-degrees and records each node's direct ancestors
//! - [`schedule`] reduces the graph into layers of nodes that can run
//!   concurrently, or reports the nodes stuck in a cycle
//!
//! Edges that reference nodes missing from the snapshot are ignored rather
//! than rejected, so a half-edited canvas can still be scheduled.

mod error;
mod graph;
mod schedule;

pub use error::WorkflowError;
pub use graph::{Dependent, DependencyGraph};
pub use schedule::{Layer, schedule};
