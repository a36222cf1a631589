//! Per-run options.

use serde::{Deserialize, Serialize};

/// What started a run. Recorded in history only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunTrigger {
  /// Run button or keyboard shortcut on the canvas.
  #[default]
  Manual,
  /// An external caller (CLI, automation).
  Api,
  /// A timer.
  Scheduled,
}

/// Options controlling scope and failure policy of a run.
///
/// The retry and skip policies read the failed set of the previous
/// unsuccessful run, so they only take effect together with `resume`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunOptions {
  /// Run only these nodes and their ancestors. `None` or empty runs the
  /// full graph.
  pub target_node_ids: Option<Vec<String>>,
  pub trigger: RunTrigger,
  /// Reuse the scope and cached outputs of the previous unsuccessful run.
  pub resume: bool,
  /// Force these nodes and everything downstream of them to re-execute.
  pub retry_node_ids: Option<Vec<String>>,
  /// Force the previously failed nodes and everything downstream of them to
  /// re-execute.
  pub retry_failed: bool,
  /// Treat the previously failed nodes as resolved without output.
  pub skip_failed: bool,
  /// Keep dispatching later layers after a node failure.
  pub continue_on_error: bool,
}

impl RunOptions {
  /// Options for resuming the previous unsuccessful run.
  pub fn resume() -> Self {
    Self {
      resume: true,
      ..Self::default()
    }
  }

  /// Options for a run scoped to `targets` and their ancestors.
  pub fn targeted<I, S>(targets: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      target_node_ids: Some(targets.into_iter().map(Into::into).collect()),
      ..Self::default()
    }
  }

  pub fn retry_failed(mut self) -> Self {
    self.retry_failed = true;
    self
  }

  pub fn retry_nodes<I, S>(mut self, node_ids: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.retry_node_ids = Some(node_ids.into_iter().map(Into::into).collect());
    self
  }

  pub fn skip_failed(mut self) -> Self {
    self.skip_failed = true;
    self
  }

  pub fn continue_on_error(mut self) -> Self {
    self.continue_on_error = true;
    self
  }

  pub fn with_trigger(mut self, trigger: RunTrigger) -> Self {
    self.trigger = trigger;
    self
  }

  /// Whether later layers keep running after a node failure.
  pub fn allows_partial(&self) -> bool {
    self.continue_on_error || self.skip_failed
  }
}
