//! Weft Task Runtime
//!
//! The contract between the orchestrator and whatever actually runs a node
//! (a text model call, an image generation job polled until done, ...).
//!
//! - [`NodeExecutor`] executes one node given its aggregated inputs
//! - [`NodeInputs`] / [`HandleInput`] describe what arrived on each input handle
//! - [`ExecutionContext`] carries credentials and provider configuration the
//!   engine passes through without looking at
//! - [`ExecutorRegistry`] dispatches on the node's type tag
//!
//! Executors own their timeouts. The orchestrator propagates whatever error
//! an executor returns and never imposes a deadline of its own.

mod context;
mod error;
mod executor;
mod input;
mod passthrough;

pub use context::{Credential, ExecutionContext};
pub use error::NodeExecutionError;
pub use executor::{ExecutorRegistry, NodeExecutor};
pub use input::{HandleInput, InputRecord, NodeInputs};
pub use passthrough::PassthroughExecutor;
