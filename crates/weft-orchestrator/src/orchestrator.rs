//! The run coordinator.
//!
//! A run moves through scoping, scheduling and one execution step per layer
//! before settling as completed, partially completed, failed or cancelled.
//! All bookkeeping (`node_outputs`, failures, progress) is mutated only by the
//! task calling [`Orchestrator::run`]; node tasks just return their result.
//! The join at the end of each layer is what makes a layer's outputs visible
//! to the next one.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, trace, warn};
use weft_config::{Node, NodeOutput, WorkflowDef};
use weft_task_runtime::{ExecutionContext, NodeExecutionError, NodeExecutor};
use weft_workflow::{DependencyGraph, Layer, WorkflowError, schedule};

use crate::config::OrchestratorConfig;
use crate::error::ExecutionError;
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier, Progress};
use crate::history::{HistorySink, RunHistoryLog, RunRecord};
use crate::input::resolve_inputs;
use crate::options::RunOptions;
use crate::result::{RunPhase, RunResult, RunScope, RunStatus, ScopeKind};
use crate::state::{ExecutionState, ExecutionStateStore};

/// Everything a run decided before dispatching its first layer.
struct RunPlan {
  scope: RunScope,
  /// Scoped nodes in snapshot order.
  nodes: Vec<Node>,
  /// Outputs seeded from the resumed run.
  seeded: HashMap<String, NodeOutput>,
  /// Nodes resolved without output for this run.
  skipped: BTreeSet<String>,
  allow_partial: bool,
}

/// How the layer loop ended.
enum LayerOutcome {
  /// Every layer was processed.
  Finished,
  /// A failure stopped the run after the given layer.
  Aborted { layer: usize },
  /// The token was cancelled before the given layer.
  Cancelled { layer: usize },
}

/// Mutable bookkeeping of a run in progress.
struct RunProgress {
  node_outputs: HashMap<String, NodeOutput>,
  /// Failures in the order they settled.
  failures: Vec<(String, NodeExecutionError)>,
  completed: usize,
  total: usize,
}

/// The workflow orchestrator.
///
/// One instance is one session: it holds the resumable state of the last
/// unsuccessful run and the history of recent runs. Runs on the same instance
/// are serialized, and their lifecycle events go to the notifier `N`.
pub struct Orchestrator<N: ExecutionNotifier = NoopNotifier> {
  executor: Arc<dyn NodeExecutor>,
  context: Arc<ExecutionContext>,
  notifier: N,
  state: ExecutionStateStore,
  history: RunHistoryLog,
  history_sink: Option<Arc<dyn HistorySink>>,
  run_lock: Mutex<()>,
}

impl Orchestrator<NoopNotifier> {
  /// Create an orchestrator with no-op notifications.
  pub fn new(executor: Arc<dyn NodeExecutor>, config: OrchestratorConfig) -> Self {
    Self::with_notifier(executor, config, NoopNotifier)
  }
}

impl<N: ExecutionNotifier> Orchestrator<N> {
  /// Create an orchestrator with a custom notifier.
  pub fn with_notifier(
    executor: Arc<dyn NodeExecutor>,
    config: OrchestratorConfig,
    notifier: N,
  ) -> Self {
    Self {
      executor,
      context: Arc::new(ExecutionContext::default()),
      notifier,
      state: ExecutionStateStore::new(),
      history: RunHistoryLog::new(config.history_capacity),
      history_sink: None,
      run_lock: Mutex::new(()),
    }
  }

  /// Set the context passed to every executor invocation.
  pub fn with_context(mut self, context: ExecutionContext) -> Self {
    self.context = Arc::new(context);
    self
  }

  /// Hand every run record to `sink` in addition to the in-memory log.
  pub fn with_history_sink(mut self, sink: Arc<dyn HistorySink>) -> Self {
    self.history_sink = Some(sink);
    self
  }

  /// Resumable state left by the last run.
  pub fn state(&self) -> &ExecutionStateStore {
    &self.state
  }

  /// Recent run summaries.
  pub fn history(&self) -> &RunHistoryLog {
    &self.history
  }

  /// The layers a run with `options` would walk, without running anything.
  ///
  /// Cached and skipped nodes are still listed; they are filtered at dispatch.
  pub fn plan(
    &self,
    workflow: &WorkflowDef,
    options: &RunOptions,
  ) -> Result<Vec<Layer>, WorkflowError> {
    let prior = self.state.snapshot();
    let full_graph = DependencyGraph::build(&workflow.nodes, &workflow.edges);
    let scope = resolve_scope(workflow, &full_graph, options, &prior);
    let nodes = scoped_nodes(workflow, &scope);
    schedule(&DependencyGraph::build(&nodes, &workflow.edges))
  }

  /// Execute `workflow` under `options`.
  ///
  /// Returns a result when every layer was processed, including runs where
  /// some nodes failed under a partial policy. Returns an error when the
  /// scoped graph has a cycle, when a node failed without a partial policy,
  /// or when `cancel` fired. In every case a run record is appended; in the
  /// failed and cancelled cases the state needed to resume is persisted.
  #[instrument(
    name = "orchestrator_run",
    skip(self, workflow, options, cancel),
    fields(
      workflow_id = %workflow.workflow_id,
      run_id = tracing::field::Empty,
    )
  )]
  pub async fn run(
    &self,
    workflow: &WorkflowDef,
    options: RunOptions,
    cancel: CancellationToken,
  ) -> Result<RunResult, ExecutionError> {
    let _guard = self.run_lock.lock().await;

    let run_id = uuid::Uuid::new_v4().to_string();
    tracing::Span::current().record("run_id", run_id.as_str());
    let started_at = Utc::now();
    let clock = Instant::now();

    trace!(run_id = %run_id, phase = %RunPhase::Scoping, "phase");
    let prior = self.state.snapshot();
    let plan = self.prepare(workflow, &options, &prior);

    info!(
      run_id = %run_id,
      workflow_id = %workflow.workflow_id,
      scope = ?plan.scope.kind,
      scope_size = plan.scope.len(),
      seeded = plan.seeded.len(),
      skipped = plan.skipped.len(),
      "run_started"
    );
    self.notifier.notify(ExecutionEvent::RunStarted {
      run_id: run_id.clone(),
      workflow_id: workflow.workflow_id.clone(),
      scope_size: plan.scope.len(),
    });

    trace!(run_id = %run_id, phase = %RunPhase::Scheduling, "phase");
    let graph = DependencyGraph::build(&plan.nodes, &workflow.edges);
    let layers = match schedule(&graph) {
      Ok(layers) => layers,
      Err(e) => {
        // Nothing ran: leave the resumable state of the previous run alone.
        error!(run_id = %run_id, error = %e, "run_failed");
        let record = RunRecord {
          id: run_id.clone(),
          workflow_id: workflow.workflow_id.clone(),
          started_at,
          finished_at: Utc::now(),
          duration_ms: elapsed_ms(clock),
          success: false,
          node_count: plan.scope.len(),
          completed_count: 0,
          output_count: plan.seeded.len(),
          error: Some(e.to_string()),
          trigger: options.trigger,
          scope: plan.scope.kind,
        };
        self.finish(&run_id, record, RunStatus::Failed).await;
        return Err(e.into());
      }
    };

    let total = plan
      .nodes
      .iter()
      .filter(|n| !plan.seeded.contains_key(&n.id) && !plan.skipped.contains(&n.id))
      .count();
    let mut progress = RunProgress {
      node_outputs: plan.seeded.clone(),
      failures: Vec::new(),
      completed: 0,
      total,
    };

    let outcome = self
      .execute_layers(&run_id, workflow, &plan, &layers, &mut progress, &cancel)
      .await;

    let status = match outcome {
      LayerOutcome::Finished if progress.failures.is_empty() => RunStatus::Completed,
      LayerOutcome::Finished => RunStatus::PartiallyCompleted,
      LayerOutcome::Aborted { .. } => RunStatus::Failed,
      LayerOutcome::Cancelled { .. } => RunStatus::Cancelled,
    };

    let failed_node_ids: Vec<String> = progress.failures.iter().map(|(id, _)| id.clone()).collect();
    let error = match outcome {
      LayerOutcome::Cancelled { .. } => Some(ExecutionError::Cancelled),
      LayerOutcome::Aborted { layer } => {
        let (node_id, first) = &progress.failures[0];
        warn!(run_id = %run_id, layer, node_id = %node_id, "aborting run after layer failure");
        Some(ExecutionError::Aborted {
          node_id: node_id.clone(),
          message: first.to_string(),
          failed_node_ids: failed_node_ids.clone(),
        })
      }
      LayerOutcome::Finished => None,
    };
    let error_message = match (&error, status) {
      (Some(e), _) => Some(e.to_string()),
      (None, RunStatus::PartiallyCompleted) => Some(format!(
        "{} of {} nodes failed",
        failed_node_ids.len(),
        progress.total
      )),
      (None, _) => None,
    };

    if status.is_success() {
      self.state.clear();
    } else {
      self.state.replace(ExecutionState {
        node_outputs: progress
          .node_outputs
          .iter()
          .filter(|(id, _)| plan.scope.contains(id))
          .map(|(id, output)| (id.clone(), output.clone()))
          .collect(),
        scope_node_ids: Some(plan.scope.node_ids.clone()),
        failed_node_ids: failed_node_ids.iter().cloned().collect(),
      });
    }

    let duration_ms = elapsed_ms(clock);
    let record = RunRecord {
      id: run_id.clone(),
      workflow_id: workflow.workflow_id.clone(),
      started_at,
      finished_at: Utc::now(),
      duration_ms,
      success: status.is_success(),
      node_count: plan.scope.len(),
      completed_count: progress.completed,
      output_count: progress.node_outputs.len(),
      error: error_message.clone(),
      trigger: options.trigger,
      scope: plan.scope.kind,
    };
    self.finish(&run_id, record, status).await;

    if let Some(e) = error {
      return Err(e);
    }

    let node_errors = (!progress.failures.is_empty()).then(|| {
      progress
        .failures
        .iter()
        .map(|(id, e)| (id.clone(), e.to_string()))
        .collect()
    });

    Ok(RunResult {
      run_id,
      success: status.is_success(),
      status,
      workflow_id: workflow.workflow_id.clone(),
      duration_ms,
      node_outputs: progress.node_outputs,
      node_errors,
      error: error_message,
      completed_count: progress.completed,
      scope: plan.scope,
    })
  }

  /// Resolve scope, seed outputs and derive the retry and skip sets.
  fn prepare(
    &self,
    workflow: &WorkflowDef,
    options: &RunOptions,
    prior: &ExecutionState,
  ) -> RunPlan {
    let full_graph = DependencyGraph::build(&workflow.nodes, &workflow.edges);
    let scope = resolve_scope(workflow, &full_graph, options, prior);
    let nodes = scoped_nodes(workflow, &scope);

    // Seed from the resumed run; its failures must execute again.
    let mut seeded: HashMap<String, NodeOutput> = HashMap::new();
    if options.resume {
      seeded = prior
        .node_outputs
        .iter()
        .filter(|(id, _)| scope.contains(id))
        .map(|(id, output)| (id.clone(), output.clone()))
        .collect();
      for id in &prior.failed_node_ids {
        seeded.remove(id);
      }
    }

    // Retried nodes and everything downstream of them lose their cached output.
    let mut retry_roots: Vec<&str> = options
      .retry_node_ids
      .iter()
      .flatten()
      .map(String::as_str)
      .collect();
    if options.resume && options.retry_failed {
      retry_roots.extend(prior.failed_node_ids.iter().map(String::as_str));
    }
    let retry_set = full_graph.downstream_closure(retry_roots);
    for id in &retry_set {
      seeded.remove(id);
    }

    let skipped = if options.resume && options.skip_failed {
      prior
        .failed_node_ids
        .iter()
        .filter(|id| scope.contains(id))
        .cloned()
        .collect()
    } else {
      BTreeSet::new()
    };

    trace!(
      retry = ?retry_set,
      skipped = ?skipped,
      "retry and skip sets resolved"
    );

    RunPlan {
      scope,
      nodes,
      seeded,
      skipped,
      allow_partial: options.allows_partial(),
    }
  }

  /// Dispatch layers in order until done, aborted or cancelled.
  async fn execute_layers(
    &self,
    run_id: &str,
    workflow: &WorkflowDef,
    plan: &RunPlan,
    layers: &[Layer],
    progress: &mut RunProgress,
    cancel: &CancellationToken,
  ) -> LayerOutcome {
    let nodes_by_id: HashMap<&str, &Node> = plan.nodes.iter().map(|n| (n.id.as_str(), n)).collect();

    for (index, layer) in layers.iter().enumerate() {
      if cancel.is_cancelled() {
        warn!(run_id = %run_id, layer = index, "run cancelled");
        return LayerOutcome::Cancelled { layer: index };
      }

      let phase = RunPhase::ExecutingLayer { index };
      trace!(run_id = %run_id, phase = %phase, "phase");
      let ready: Vec<&Node> = layer
        .iter()
        .filter(|id| !progress.node_outputs.contains_key(*id) && !plan.skipped.contains(*id))
        .filter_map(|id| nodes_by_id.get(id.as_str()).copied())
        .collect();

      if ready.is_empty() {
        trace!(run_id = %run_id, layer = index, "layer fully cached or skipped");
        continue;
      }

      info!(
        run_id = %run_id,
        layer = index,
        ready_nodes = ?ready.iter().map(|n| n.id.as_str()).collect::<Vec<_>>(),
        "layer_dispatched"
      );

      let failures_before = progress.failures.len();
      self
        .execute_layer(run_id, workflow, plan, &ready, progress)
        .await;

      if progress.failures.len() > failures_before && !plan.allow_partial {
        return LayerOutcome::Aborted { layer: index };
      }
    }

    LayerOutcome::Finished
  }

  /// Run every node of one layer concurrently and wait for all of them.
  async fn execute_layer(
    &self,
    run_id: &str,
    workflow: &WorkflowDef,
    plan: &RunPlan,
    ready: &[&Node],
    progress: &mut RunProgress,
  ) {
    let mut pending = FuturesUnordered::new();

    for node in ready {
      let inputs = resolve_inputs(node, &workflow.edges, &plan.nodes, &progress.node_outputs);

      info!(
        run_id = %run_id,
        node_id = %node.id,
        node_type = %node.node_type,
        input_handles = ?inputs.keys().collect::<Vec<_>>(),
        "node_started"
      );
      self.notifier.notify(ExecutionEvent::NodeStarted {
        run_id: run_id.to_string(),
        node_id: node.id.clone(),
        node_type: node.node_type.clone(),
      });

      let executor = self.executor.clone();
      let context = self.context.clone();
      let owned = (*node).clone();
      let node_id = node.id.clone();
      let handle =
        tokio::spawn(async move { executor.execute(&owned, &inputs, &context).await });

      pending.push(async move {
        let result = handle
          .await
          .unwrap_or_else(|e| Err(NodeExecutionError::Aborted { message: e.to_string() }));
        (node_id, result)
      });
    }

    // Settle in completion order; the layer is done when all have settled.
    while let Some((node_id, result)) = pending.next().await {
      match result {
        Ok(output) => {
          info!(run_id = %run_id, node_id = %node_id, handles = output.len(), "node_completed");
          self.notifier.notify(ExecutionEvent::NodeCompleted {
            run_id: run_id.to_string(),
            node_id: node_id.clone(),
            output: output.clone(),
          });
          progress.node_outputs.insert(node_id, output);
          progress.completed += 1;
          self.notifier.notify(ExecutionEvent::Progress {
            run_id: run_id.to_string(),
            progress: Progress::new(progress.completed, progress.total),
          });
        }
        Err(e) => {
          error!(run_id = %run_id, node_id = %node_id, error = %e, "node_failed");
          self.notifier.notify(ExecutionEvent::NodeFailed {
            run_id: run_id.to_string(),
            node_id: node_id.clone(),
            error: e.to_string(),
          });
          progress.failures.push((node_id, e));
        }
      }
    }
  }

  /// Append the record, hand it to the sink and emit the terminal event.
  async fn finish(&self, run_id: &str, record: RunRecord, status: RunStatus) {
    trace!(run_id = %run_id, phase = %RunPhase::from(status), "phase");
    match status {
      RunStatus::Completed => info!(run_id = %run_id, duration_ms = record.duration_ms, "run_completed"),
      _ => warn!(
        run_id = %run_id,
        status = ?status,
        error = record.error.as_deref().unwrap_or_default(),
        "run_finished_unsuccessfully"
      ),
    }

    self.history.append(record.clone());
    if let Some(sink) = &self.history_sink {
      if let Err(e) = sink.persist(&record).await {
        warn!(run_id = %run_id, error = %e, "failed to hand off run record");
      }
    }

    self.notifier.notify(ExecutionEvent::RunFinished {
      run_id: run_id.to_string(),
      status,
      error: record.error,
    });
  }
}

/// Pick the node set of a run.
fn resolve_scope(
  workflow: &WorkflowDef,
  full_graph: &DependencyGraph,
  options: &RunOptions,
  prior: &ExecutionState,
) -> RunScope {
  if options.resume {
    if let Some(scope) = prior.resumable_scope() {
      return RunScope {
        kind: ScopeKind::Resumed,
        node_ids: scope.clone(),
      };
    }
  }

  match options.target_node_ids.as_deref() {
    Some(targets) if !targets.is_empty() => {
      for target in targets.iter().filter(|t| !full_graph.contains(t)) {
        warn!(node_id = %target, "ignoring unknown target node");
      }
      RunScope {
        kind: ScopeKind::Targeted,
        node_ids: full_graph.ancestor_closure(targets),
      }
    }
    _ => RunScope {
      kind: ScopeKind::Full,
      node_ids: workflow.nodes.iter().map(|n| n.id.clone()).collect(),
    },
  }
}

/// Nodes of the live snapshot that belong to `scope`, in snapshot order.
fn scoped_nodes(workflow: &WorkflowDef, scope: &RunScope) -> Vec<Node> {
  workflow
    .nodes
    .iter()
    .filter(|n| scope.contains(&n.id))
    .cloned()
    .collect()
}

fn elapsed_ms(clock: Instant) -> u64 {
  u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX)
}
