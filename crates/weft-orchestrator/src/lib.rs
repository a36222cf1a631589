//! Weft Orchestrator
//!
//! This crate drives a workflow graph to completion:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Orchestrator                          │
//! │  - resolves run scope (full / targeted / resumed)           │
//! │  - seeds cached outputs, applies retry and skip sets        │
//! │  - dispatches each layer concurrently, joins at a barrier   │
//! │  - persists resumable state, appends run history            │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      resolve_inputs                         │
//! │  - gathers upstream payloads per input handle               │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       NodeExecutor                          │
//! │  - runs one node (provider calls live behind this trait)    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use weft_orchestrator::{Orchestrator, OrchestratorConfig, RunOptions};
//!
//! let orchestrator = Orchestrator::new(Arc::new(registry), OrchestratorConfig::default());
//!
//! // First attempt fails part-way through
//! let _ = orchestrator.run(&workflow, RunOptions::default(), CancellationToken::new()).await;
//!
//! // Re-run only the failed nodes and everything downstream of them
//! let result = orchestrator
//!   .run(&workflow, RunOptions::resume().retry_failed(), CancellationToken::new())
//!   .await?;
//! ```
//!
//! One `Orchestrator` is one session: it owns the resumable state of the last
//! unsuccessful run and the bounded history of run summaries.

mod config;
mod error;
mod events;
mod history;
mod input;
mod options;
mod orchestrator;
mod result;
mod state;

pub use config::OrchestratorConfig;
pub use error::ExecutionError;
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, FnNotifier, NoopNotifier, Progress};
pub use history::{
  ChannelHistorySink, DEFAULT_HISTORY_CAPACITY, HistoryError, HistorySink, RunHistoryLog, RunRecord,
};
pub use input::resolve_inputs;
pub use options::{RunOptions, RunTrigger};
pub use orchestrator::Orchestrator;
pub use result::{RunPhase, RunResult, RunScope, RunStatus, ScopeKind};
pub use state::{ExecutionState, ExecutionStateStore};

pub use weft_config::{Edge, Node, NodeOutput, Payload, WorkflowDef};
pub use weft_task_runtime::{
  Credential, ExecutionContext, ExecutorRegistry, HandleInput, InputRecord, NodeExecutionError,
  NodeExecutor, NodeInputs, PassthroughExecutor,
};
pub use weft_workflow::{Layer, WorkflowError};
