//! Bounded run history and the hand-off to external persistence.

use std::collections::VecDeque;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::options::RunTrigger;
use crate::result::ScopeKind;

/// Number of run summaries kept when no capacity is configured.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Summary of one run. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
  pub id: String,
  pub workflow_id: String,
  pub started_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
  pub duration_ms: u64,
  pub success: bool,
  /// Size of the run's scope.
  pub node_count: usize,
  /// Nodes executed successfully by the run.
  pub completed_count: usize,
  /// Nodes holding an output when the run ended, cached ones included.
  pub output_count: usize,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  pub trigger: RunTrigger,
  pub scope: ScopeKind,
}

/// Append-only log of run summaries, most recent first.
///
/// Holds at most `capacity` records; appending to a full log evicts the oldest.
#[derive(Debug)]
pub struct RunHistoryLog {
  capacity: usize,
  entries: RwLock<VecDeque<RunRecord>>,
}

impl RunHistoryLog {
  /// Create a log holding at most `capacity` records (at least one).
  pub fn new(capacity: usize) -> Self {
    let capacity = capacity.max(1);
    Self {
      capacity,
      entries: RwLock::new(VecDeque::with_capacity(capacity)),
    }
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn append(&self, record: RunRecord) {
    let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
    entries.push_front(record);
    entries.truncate(self.capacity);
  }

  /// All records, most recent first.
  pub fn entries(&self) -> Vec<RunRecord> {
    self
      .entries
      .read()
      .unwrap_or_else(|e| e.into_inner())
      .iter()
      .cloned()
      .collect()
  }

  pub fn latest(&self) -> Option<RunRecord> {
    self
      .entries
      .read()
      .unwrap_or_else(|e| e.into_inner())
      .front()
      .cloned()
  }

  pub fn len(&self) -> usize {
    self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn clear(&self) {
    self
      .entries
      .write()
      .unwrap_or_else(|e| e.into_inner())
      .clear();
  }
}

impl Default for RunHistoryLog {
  fn default() -> Self {
    Self::new(DEFAULT_HISTORY_CAPACITY)
  }
}

/// Error type for history sinks.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
  /// The receiving side has gone away.
  #[error("history sink closed")]
  Closed,

  /// The sink failed to store the record.
  #[error("failed to persist run record: {message}")]
  Persist { message: String },
}

/// External persistence for run records.
///
/// The orchestrator hands every record to the sink after appending it to its
/// own log. Sink failures are logged and never fail the run.
#[async_trait]
pub trait HistorySink: Send + Sync {
  async fn persist(&self, record: &RunRecord) -> Result<(), HistoryError>;
}

/// A sink that forwards records to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelHistorySink {
  sender: mpsc::UnboundedSender<RunRecord>,
}

impl ChannelHistorySink {
  pub fn new(sender: mpsc::UnboundedSender<RunRecord>) -> Self {
    Self { sender }
  }

  pub fn channel() -> (Self, mpsc::UnboundedReceiver<RunRecord>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }
}

#[async_trait]
impl HistorySink for ChannelHistorySink {
  async fn persist(&self, record: &RunRecord) -> Result<(), HistoryError> {
    self
      .sender
      .send(record.clone())
      .map_err(|_| HistoryError::Closed)
  }
}
