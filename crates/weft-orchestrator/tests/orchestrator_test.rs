//! Integration tests for Orchestrator::run using in-process fake executors.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use weft_orchestrator::{
  ChannelHistorySink, ChannelNotifier, Edge, ExecutionContext, ExecutionError, ExecutionEvent,
  HandleInput, Node, NodeExecutionError, NodeExecutor, NodeInputs, NodeOutput, Orchestrator,
  OrchestratorConfig, Payload, RunOptions, RunStatus, RunTrigger, ScopeKind, WorkflowDef,
  WorkflowError,
};

/// Records every invocation and fails the nodes it is told to fail.
#[derive(Default)]
struct FakeExecutor {
  calls: Mutex<Vec<String>>,
  inputs: Mutex<HashMap<String, NodeInputs>>,
  failing: Mutex<HashSet<String>>,
  delays: HashMap<String, u64>,
  panicking: HashSet<String>,
}

impl FakeExecutor {
  fn failing(ids: &[&str]) -> Arc<Self> {
    let executor = Self::default();
    executor.fail(ids);
    Arc::new(executor)
  }

  fn with_delays(delays: &[(&str, u64)]) -> Arc<Self> {
    Arc::new(Self {
      delays: delays.iter().map(|(id, ms)| (id.to_string(), *ms)).collect(),
      ..Self::default()
    })
  }

  fn panicking(ids: &[&str], delays: &[(&str, u64)]) -> Arc<Self> {
    Arc::new(Self {
      delays: delays.iter().map(|(id, ms)| (id.to_string(), *ms)).collect(),
      panicking: ids.iter().map(|id| id.to_string()).collect(),
      ..Self::default()
    })
  }

  fn fail(&self, ids: &[&str]) {
    let mut failing = self.failing.lock().unwrap();
    failing.clear();
    failing.extend(ids.iter().map(|id| id.to_string()));
  }

  fn calls(&self) -> Vec<String> {
    self.calls.lock().unwrap().clone()
  }

  fn reset_calls(&self) {
    self.calls.lock().unwrap().clear();
  }

  fn inputs_of(&self, node_id: &str) -> NodeInputs {
    self.inputs.lock().unwrap()[node_id].clone()
  }
}

#[async_trait]
impl NodeExecutor for FakeExecutor {
  async fn execute(
    &self,
    node: &Node,
    inputs: &NodeInputs,
    _context: &ExecutionContext,
  ) -> Result<NodeOutput, NodeExecutionError> {
    self.calls.lock().unwrap().push(node.id.clone());
    self
      .inputs
      .lock()
      .unwrap()
      .insert(node.id.clone(), inputs.clone());

    if let Some(ms) = self.delays.get(&node.id) {
      tokio::time::sleep(Duration::from_millis(*ms)).await;
    }

    if self.panicking.contains(&node.id) {
      panic!("boom");
    }

    if self.failing.lock().unwrap().contains(&node.id) {
      return Err(NodeExecutionError::Provider {
        message: format!("{} exploded", node.id),
      });
    }

    let mut output = NodeOutput::new();
    output.insert("default".to_string(), Payload::text(format!("out:{}", node.id)));
    Ok(output)
  }
}

fn workflow(ids: &[&str], edges: &[(&str, &str)]) -> WorkflowDef {
  WorkflowDef::new(
    "test-workflow",
    ids.iter().map(|id| Node::new(*id, "text")).collect(),
    edges
      .iter()
      .enumerate()
      .map(|(i, (source, target))| Edge::new(format!("e{i}"), *source, *target))
      .collect(),
  )
}

/// a -> {b, c} -> d
fn diamond() -> WorkflowDef {
  workflow(
    &["a", "b", "c", "d"],
    &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
  )
}

fn orchestrator(executor: Arc<FakeExecutor>) -> Orchestrator {
  Orchestrator::new(executor, OrchestratorConfig::default())
}

fn sorted(ids: Vec<String>) -> Vec<String> {
  let mut ids = ids;
  ids.sort();
  ids
}

fn set(ids: &[&str]) -> BTreeSet<String> {
  ids.iter().map(|id| id.to_string()).collect()
}

#[tokio::test]
async fn test_full_run_completes_and_clears_state() {
  let executor = Arc::new(FakeExecutor::default());
  let orchestrator = orchestrator(executor.clone());

  let result = orchestrator
    .run(&diamond(), RunOptions::default(), CancellationToken::new())
    .await
    .unwrap();

  assert!(result.success);
  assert_eq!(result.status, RunStatus::Completed);
  assert_eq!(result.completed_count, 4);
  assert_eq!(result.node_outputs.len(), 4);
  assert!(result.node_errors.is_none());
  assert_eq!(result.scope.kind, ScopeKind::Full);

  let calls = executor.calls();
  assert_eq!(calls[0], "a");
  assert_eq!(calls[3], "d");

  assert!(!orchestrator.state().is_resumable());
  let record = orchestrator.history().latest().unwrap();
  assert!(record.success);
  assert_eq!(record.id, result.run_id);
  assert_eq!(record.node_count, 4);
  assert_eq!(record.trigger, RunTrigger::Manual);
}

#[tokio::test]
async fn test_fan_in_receives_ordered_list_on_shared_handle() {
  let executor = Arc::new(FakeExecutor::default());
  let orchestrator = orchestrator(executor.clone());
  let workflow = workflow(&["a", "b", "c"], &[("a", "c"), ("b", "c")]);

  orchestrator
    .run(&workflow, RunOptions::default(), CancellationToken::new())
    .await
    .unwrap();

  let inputs = executor.inputs_of("c");
  let HandleInput::Many(records) = &inputs["default"] else {
    panic!("expected two records on the shared handle");
  };
  assert_eq!(records.len(), 2);
  assert_eq!(records[0].source_node, "a");
  assert_eq!(records[0].payload.value, json!("out:a"));
  assert_eq!(records[1].source_node, "b");
}

#[tokio::test]
async fn test_failure_stops_before_next_layer() {
  // a -> {b, c} -> d, b fails
  let executor = FakeExecutor::failing(&["b"]);
  let orchestrator = orchestrator(executor.clone());

  let err = orchestrator
    .run(&diamond(), RunOptions::default(), CancellationToken::new())
    .await
    .unwrap_err();

  match err {
    ExecutionError::Aborted {
      node_id,
      message,
      failed_node_ids,
    } => {
      assert_eq!(node_id, "b");
      assert!(message.contains("b exploded"));
      assert_eq!(failed_node_ids, vec!["b".to_string()]);
    }
    other => panic!("unexpected error: {other}"),
  }

  assert!(!executor.calls().contains(&"d".to_string()));

  let state = orchestrator.state().snapshot();
  assert_eq!(state.failed_node_ids, set(&["b"]));
  assert_eq!(
    state.node_outputs.keys().cloned().collect::<BTreeSet<_>>(),
    set(&["a", "c"])
  );
  assert_eq!(state.scope_node_ids, Some(set(&["a", "b", "c", "d"])));

  let record = orchestrator.history().latest().unwrap();
  assert!(!record.success);
  assert_eq!(record.completed_count, 2);
  assert!(record.error.unwrap().contains("b exploded"));
}

#[tokio::test]
async fn test_resume_with_retry_failed_reexecutes_only_failed_and_downstream() {
  let executor = FakeExecutor::failing(&["b"]);
  let orchestrator = orchestrator(executor.clone());
  let workflow = diamond();

  let _ = orchestrator
    .run(&workflow, RunOptions::default(), CancellationToken::new())
    .await;

  executor.fail(&[]);
  executor.reset_calls();

  let result = orchestrator
    .run(
      &workflow,
      RunOptions::resume().retry_failed(),
      CancellationToken::new(),
    )
    .await
    .unwrap();

  assert_eq!(sorted(executor.calls()), vec!["b", "d"]);
  assert_eq!(result.scope.kind, ScopeKind::Resumed);
  assert_eq!(result.completed_count, 2);
  assert_eq!(result.node_outputs.len(), 4);
  assert!(!orchestrator.state().is_resumable());

  // d saw the cached output of c alongside the fresh output of b
  let inputs = executor.inputs_of("d");
  let sources: Vec<&str> = inputs["default"]
    .records()
    .iter()
    .map(|r| r.source_node.as_str())
    .collect();
  assert_eq!(sources, vec!["b", "c"]);
}

#[tokio::test]
async fn test_resume_without_retry_still_reruns_failed_nodes() {
  let executor = FakeExecutor::failing(&["b"]);
  let orchestrator = orchestrator(executor.clone());
  let workflow = diamond();

  let _ = orchestrator
    .run(&workflow, RunOptions::default(), CancellationToken::new())
    .await;
  executor.fail(&[]);
  executor.reset_calls();

  orchestrator
    .run(&workflow, RunOptions::resume(), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(sorted(executor.calls()), vec!["b", "d"]);
}

#[tokio::test]
async fn test_resume_with_skip_failed_runs_downstream_without_failed_input() {
  let executor = FakeExecutor::failing(&["b"]);
  let orchestrator = orchestrator(executor.clone());
  let workflow = diamond();

  let _ = orchestrator
    .run(&workflow, RunOptions::default(), CancellationToken::new())
    .await;
  executor.reset_calls();

  let result = orchestrator
    .run(
      &workflow,
      RunOptions::resume().skip_failed(),
      CancellationToken::new(),
    )
    .await
    .unwrap();

  assert_eq!(executor.calls(), vec!["d"]);
  assert!(!result.node_outputs.contains_key("b"));

  let inputs = executor.inputs_of("d");
  let HandleInput::Single(record) = &inputs["default"] else {
    panic!("expected a single record from c");
  };
  assert_eq!(record.source_node, "c");
}

#[tokio::test]
async fn test_panicking_node_fails_after_slow_sibling_settles() {
  // a -> {b, c} -> d, b panics immediately while c is still sleeping
  let executor = FakeExecutor::panicking(&["b"], &[("c", 100)]);
  let orchestrator = orchestrator(executor.clone());

  let err = orchestrator
    .run(&diamond(), RunOptions::default(), CancellationToken::new())
    .await
    .unwrap_err();

  match err {
    ExecutionError::Aborted {
      node_id,
      message,
      failed_node_ids,
    } => {
      assert_eq!(node_id, "b");
      assert!(message.contains("node task aborted"), "{message}");
      assert_eq!(failed_node_ids, vec!["b".to_string()]);
    }
    other => panic!("unexpected error: {other}"),
  }

  assert!(!executor.calls().contains(&"d".to_string()));

  let state = orchestrator.state().snapshot();
  assert_eq!(state.failed_node_ids, set(&["b"]));
  assert_eq!(
    state.node_outputs.keys().cloned().collect::<BTreeSet<_>>(),
    set(&["a", "c"])
  );
}

#[tokio::test]
async fn test_skip_wins_over_retry_for_failed_nodes() {
  let executor = FakeExecutor::failing(&["b"]);
  let orchestrator = orchestrator(executor.clone());
  let workflow = diamond();

  let _ = orchestrator
    .run(&workflow, RunOptions::default(), CancellationToken::new())
    .await;
  executor.fail(&[]);
  executor.reset_calls();

  let result = orchestrator
    .run(
      &workflow,
      RunOptions::resume().retry_failed().skip_failed(),
      CancellationToken::new(),
    )
    .await
    .unwrap();

  let calls = executor.calls();
  assert!(!calls.contains(&"b".to_string()));
  assert_eq!(calls, vec!["d"]);
  assert!(!result.node_outputs.contains_key("b"));
}

#[tokio::test]
async fn test_continue_on_error_returns_partial_result() {
  let executor = FakeExecutor::failing(&["b"]);
  let orchestrator = orchestrator(executor.clone());

  let result = orchestrator
    .run(
      &diamond(),
      RunOptions::default().continue_on_error(),
      CancellationToken::new(),
    )
    .await
    .unwrap();

  assert!(!result.success);
  assert_eq!(result.status, RunStatus::PartiallyCompleted);
  assert!(executor.calls().contains(&"d".to_string()));
  assert_eq!(result.completed_count, 3);

  let errors = result.node_errors.unwrap();
  assert_eq!(errors.len(), 1);
  assert!(errors["b"].contains("b exploded"));
  assert!(result.error.is_some());

  let state = orchestrator.state().snapshot();
  assert_eq!(state.failed_node_ids, set(&["b"]));
  assert!(state.node_outputs.contains_key("d"));
}

#[tokio::test]
async fn test_cycle_fails_before_any_execution() {
  let executor = Arc::new(FakeExecutor::default());
  let orchestrator = orchestrator(executor.clone());
  let workflow = workflow(&["a", "b"], &[("a", "b"), ("b", "a")]);

  let err = orchestrator
    .run(&workflow, RunOptions::default(), CancellationToken::new())
    .await
    .unwrap_err();

  match err {
    ExecutionError::Graph(WorkflowError::Cycle { node_ids }) => {
      assert_eq!(node_ids, vec!["a".to_string(), "b".to_string()]);
    }
    other => panic!("unexpected error: {other}"),
  }
  assert!(executor.calls().is_empty());
  assert!(!orchestrator.state().is_resumable());

  let record = orchestrator.history().latest().unwrap();
  assert!(!record.success);
  assert_eq!(record.completed_count, 0);
  assert!(record.error.unwrap().contains("cycle"));
}

#[tokio::test]
async fn test_targeted_run_executes_ancestor_closure_only() {
  let executor = Arc::new(FakeExecutor::default());
  let orchestrator = orchestrator(executor.clone());

  let result = orchestrator
    .run(
      &diamond(),
      RunOptions::targeted(["b", "nope"]),
      CancellationToken::new(),
    )
    .await
    .unwrap();

  assert_eq!(executor.calls(), vec!["a", "b"]);
  assert_eq!(result.scope.kind, ScopeKind::Targeted);
  assert_eq!(result.scope.node_ids, set(&["a", "b"]));
}

#[tokio::test]
async fn test_resume_keeps_persisted_scope_when_graph_grows() {
  let executor = FakeExecutor::failing(&["b"]);
  let orchestrator = orchestrator(executor.clone());

  let _ = orchestrator
    .run(
      &diamond(),
      RunOptions::targeted(["b"]),
      CancellationToken::new(),
    )
    .await;
  executor.fail(&[]);
  executor.reset_calls();

  // A new node appears downstream of b between the two runs
  let grown = workflow(
    &["a", "b", "c", "d", "e"],
    &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d"), ("b", "e")],
  );
  let result = orchestrator
    .run(&grown, RunOptions::resume(), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(executor.calls(), vec!["b"]);
  assert_eq!(result.scope.node_ids, set(&["a", "b"]));
}

#[tokio::test]
async fn test_resume_without_state_is_a_cold_run() {
  let executor = Arc::new(FakeExecutor::default());
  let orchestrator = orchestrator(executor.clone());

  let result = orchestrator
    .run(&diamond(), RunOptions::resume(), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(result.scope.kind, ScopeKind::Full);
  assert_eq!(executor.calls().len(), 4);
}

#[tokio::test]
async fn test_explicit_retry_purges_downstream_outputs() {
  let executor = FakeExecutor::failing(&["d"]);
  let orchestrator = orchestrator(executor.clone());
  let workflow = diamond();

  let _ = orchestrator
    .run(&workflow, RunOptions::default(), CancellationToken::new())
    .await;
  executor.fail(&[]);
  executor.reset_calls();

  orchestrator
    .run(
      &workflow,
      RunOptions::resume().retry_nodes(["c"]),
      CancellationToken::new(),
    )
    .await
    .unwrap();

  assert_eq!(sorted(executor.calls()), vec!["c", "d"]);
}

#[tokio::test]
async fn test_history_is_capped_and_newest_first() {
  let executor = Arc::new(FakeExecutor::default());
  let orchestrator = Orchestrator::new(executor, OrchestratorConfig { history_capacity: 2 });
  let workflow = workflow(&["a"], &[]);

  let mut run_ids = Vec::new();
  for _ in 0..3 {
    let result = orchestrator
      .run(&workflow, RunOptions::default(), CancellationToken::new())
      .await
      .unwrap();
    run_ids.push(result.run_id);
  }

  let entries = orchestrator.history().entries();
  assert_eq!(entries.len(), 2);
  assert_eq!(entries[0].id, run_ids[2]);
  assert_eq!(entries[1].id, run_ids[1]);
}

#[tokio::test]
async fn test_cancelled_before_start_runs_nothing_and_persists_scope() {
  let executor = Arc::new(FakeExecutor::default());
  let orchestrator = orchestrator(executor.clone());
  let cancel = CancellationToken::new();
  cancel.cancel();

  let err = orchestrator
    .run(&diamond(), RunOptions::default(), cancel)
    .await
    .unwrap_err();

  assert!(matches!(err, ExecutionError::Cancelled));
  assert!(executor.calls().is_empty());
  assert!(orchestrator.state().is_resumable());
  assert!(!orchestrator.history().latest().unwrap().success);
}

#[tokio::test]
async fn test_cancel_between_layers_keeps_finished_outputs() {
  let executor = FakeExecutor::with_delays(&[("a", 50)]);
  let orchestrator = Arc::new(orchestrator(executor.clone()));
  let cancel = CancellationToken::new();

  let run = {
    let orchestrator = orchestrator.clone();
    let cancel = cancel.clone();
    tokio::spawn(async move {
      orchestrator
        .run(&diamond(), RunOptions::default(), cancel)
        .await
    })
  };

  tokio::time::sleep(Duration::from_millis(10)).await;
  cancel.cancel();

  let err = run.await.unwrap().unwrap_err();
  assert!(matches!(err, ExecutionError::Cancelled));
  assert_eq!(executor.calls(), vec!["a"]);

  let state = orchestrator.state().snapshot();
  assert!(state.node_outputs.contains_key("a"));
  assert!(state.failed_node_ids.is_empty());
}

#[tokio::test]
async fn test_events_follow_run_order() {
  let executor = Arc::new(FakeExecutor::default());
  let (notifier, mut rx) = ChannelNotifier::channel();
  let orchestrator =
    Orchestrator::with_notifier(executor, OrchestratorConfig::default(), notifier);

  let result = orchestrator
    .run(
      &workflow(&["a", "b"], &[("a", "b")]),
      RunOptions::default(),
      CancellationToken::new(),
    )
    .await
    .unwrap();

  let mut events = Vec::new();
  while let Ok(event) = rx.try_recv() {
    events.push(event);
  }

  assert!(matches!(
    &events[0],
    ExecutionEvent::RunStarted { scope_size: 2, .. }
  ));
  assert!(matches!(&events[1], ExecutionEvent::NodeStarted { node_id, .. } if node_id == "a"));
  assert!(matches!(&events[2], ExecutionEvent::NodeCompleted { node_id, .. } if node_id == "a"));

  let percentages: Vec<u8> = events
    .iter()
    .filter_map(|e| match e {
      ExecutionEvent::Progress { progress, .. } => Some(progress.percentage),
      _ => None,
    })
    .collect();
  assert_eq!(percentages, vec![50, 100]);

  match events.last().unwrap() {
    ExecutionEvent::RunFinished { run_id, status, error } => {
      assert_eq!(run_id, &result.run_id);
      assert_eq!(*status, RunStatus::Completed);
      assert!(error.is_none());
    }
    other => panic!("unexpected last event: {other:?}"),
  }
}

#[tokio::test]
async fn test_history_sink_receives_every_record() {
  let executor = FakeExecutor::failing(&["a"]);
  let (sink, mut rx) = ChannelHistorySink::channel();
  let orchestrator = orchestrator(executor).with_history_sink(Arc::new(sink));

  let _ = orchestrator
    .run(
      &workflow(&["a"], &[]),
      RunOptions::default().with_trigger(RunTrigger::Api),
      CancellationToken::new(),
    )
    .await;

  let record = rx.recv().await.unwrap();
  assert!(!record.success);
  assert_eq!(record.trigger, RunTrigger::Api);
  assert_eq!(orchestrator.history().latest().unwrap(), record);
}

#[tokio::test]
async fn test_plan_lists_layers_without_executing() {
  let executor = Arc::new(FakeExecutor::default());
  let orchestrator = orchestrator(executor.clone());

  let layers = orchestrator
    .plan(&diamond(), &RunOptions::targeted(["d"]))
    .unwrap();

  assert_eq!(
    layers,
    vec![vec!["a".to_string()], vec!["b".to_string(), "c".to_string()], vec!["d".to_string()]]
  );
  assert!(executor.calls().is_empty());
}
