//! Execution events and notifiers for observability.
//!
//! Events are emitted synchronously from the orchestrator's own task, in the
//! order things happen: a slow notifier delays the run. Consumers that need
//! to do real work (persist, stream to a UI) should hand events off, e.g.
//! through [`ChannelNotifier`].

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use weft_config::NodeOutput;

use crate::result::RunStatus;

/// Progress of the nodes a run actually has to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
  pub completed: usize,
  pub total: usize,
  /// Rounded to the nearest whole percent; 100 when there is nothing to do.
  pub percentage: u8,
}

impl Progress {
  pub fn new(completed: usize, total: usize) -> Self {
    let percentage = if total == 0 {
      100
    } else {
      ((completed.min(total) as f64 / total as f64) * 100.0).round() as u8
    };
    Self {
      completed,
      total,
      percentage,
    }
  }
}

/// Events emitted during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExecutionEvent {
  /// The run has resolved its scope and is about to schedule.
  RunStarted {
    run_id: String,
    workflow_id: String,
    scope_size: usize,
  },

  /// A node has been dispatched.
  NodeStarted {
    run_id: String,
    node_id: String,
    node_type: String,
  },

  /// A node has completed successfully.
  NodeCompleted {
    run_id: String,
    node_id: String,
    output: NodeOutput,
  },

  /// A node has failed.
  NodeFailed {
    run_id: String,
    node_id: String,
    error: String,
  },

  /// A node completed; counts only nodes this run has to execute.
  Progress { run_id: String, progress: Progress },

  /// The run has reached a terminal state.
  RunFinished {
    run_id: String,
    status: RunStatus,
    error: Option<String>,
  },
}

/// Trait for receiving execution events.
///
/// The orchestrator calls `notify` for each event - implementations decide
/// what to do with them (persist, broadcast, log, ignore, etc.).
pub trait ExecutionNotifier: Send + Sync {
  /// Called when an execution event occurs.
  fn notify(&self, event: ExecutionEvent);
}

/// A no-op notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// A notifier that sends events to an unbounded channel.
///
/// Events arrive in emission order. The channel is unbounded so a slow
/// consumer never stalls a run; event volume is a handful per node.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }

  /// Create a notifier together with the receiving end of its channel.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<ExecutionEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Ignore send errors - receiver may have been dropped
    let _ = self.sender.send(event);
  }
}

/// A notifier backed by a closure.
pub struct FnNotifier<F>(F);

impl<F> FnNotifier<F>
where
  F: Fn(ExecutionEvent) + Send + Sync,
{
  pub fn new(f: F) -> Self {
    Self(f)
  }
}

impl<F> ExecutionNotifier for FnNotifier<F>
where
  F: Fn(ExecutionEvent) + Send + Sync,
{
  fn notify(&self, event: ExecutionEvent) {
    (self.0)(event)
  }
}
