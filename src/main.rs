use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use weft_config::WorkflowDef;
use weft_orchestrator::{Orchestrator, OrchestratorConfig, RunOptions};
use weft_task_runtime::PassthroughExecutor;

/// Weft - A layered workflow engine for generation graphs
#[derive(Parser)]
#[command(name = "weft")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Number of run summaries kept in memory
  #[arg(long, global = true, env = "WEFT_HISTORY_CAPACITY")]
  history_capacity: Option<usize>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Print the execution layers of a workflow without running it
  Plan {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,

    /// Restrict the run to these nodes and their ancestors
    #[arg(long = "target")]
    targets: Vec<String>,
  },

  /// Run a workflow with the passthrough executor
  Run {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,

    /// Restrict the run to these nodes and their ancestors
    #[arg(long = "target")]
    targets: Vec<String>,

    /// Keep dispatching later layers after a node fails
    #[arg(long)]
    continue_on_error: bool,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    )
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();

  let cli = Cli::parse();

  let mut config = OrchestratorConfig::default();
  if let Some(capacity) = cli.history_capacity {
    config.history_capacity = capacity;
  }

  match cli.command {
    Some(Commands::Plan {
      workflow_file,
      targets,
    }) => {
      run_plan(workflow_file, targets, config)?;
    }
    Some(Commands::Run {
      workflow_file,
      targets,
      continue_on_error,
    }) => {
      run_workflow(workflow_file, targets, continue_on_error, config)?;
    }
    None => {
      println!("weft - use --help to see available commands");
    }
  }

  Ok(())
}

fn run_options(targets: Vec<String>) -> RunOptions {
  if targets.is_empty() {
    RunOptions::default()
  } else {
    RunOptions::targeted(targets)
  }
}

fn run_plan(workflow_file: PathBuf, targets: Vec<String>, config: OrchestratorConfig) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { run_plan_async(workflow_file, targets, config).await })
}

async fn run_plan_async(
  workflow_file: PathBuf,
  targets: Vec<String>,
  config: OrchestratorConfig,
) -> Result<()> {
  let workflow = load_workflow(&workflow_file).await?;

  let orchestrator = Orchestrator::new(Arc::new(PassthroughExecutor), config);
  let layers = orchestrator
    .plan(&workflow, &run_options(targets))
    .context("failed to schedule workflow")?;

  eprintln!("Planned {} layers", layers.len());
  println!("{}", serde_json::to_string_pretty(&layers)?);

  Ok(())
}

fn run_workflow(
  workflow_file: PathBuf,
  targets: Vec<String>,
  continue_on_error: bool,
  config: OrchestratorConfig,
) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { run_workflow_async(workflow_file, targets, continue_on_error, config).await })
}

async fn run_workflow_async(
  workflow_file: PathBuf,
  targets: Vec<String>,
  continue_on_error: bool,
  config: OrchestratorConfig,
) -> Result<()> {
  let workflow = load_workflow(&workflow_file).await?;

  let mut options = run_options(targets);
  if continue_on_error {
    options = options.continue_on_error();
  }

  // Ctrl-C stops the run at the next layer boundary
  let cancel = CancellationToken::new();
  let on_signal = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      on_signal.cancel();
    }
  });

  let orchestrator = Orchestrator::new(Arc::new(PassthroughExecutor), config);
  let result = orchestrator
    .run(&workflow, options, cancel)
    .await
    .context("workflow execution failed")?;

  eprintln!("Run {} finished: {:?}", result.run_id, result.status);
  eprintln!("Nodes executed: {}", result.completed_count);

  println!("{}", serde_json::to_string_pretty(&result)?);

  Ok(())
}

async fn load_workflow(workflow_file: &Path) -> Result<WorkflowDef> {
  let content = tokio::fs::read_to_string(workflow_file)
    .await
    .with_context(|| format!("failed to read workflow file: {}", workflow_file.display()))?;

  let workflow: WorkflowDef = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse workflow file: {}", workflow_file.display()))?;

  eprintln!(
    "Loaded workflow: {} ({} nodes, {} edges)",
    workflow.workflow_id,
    workflow.nodes.len(),
    workflow.edges.len()
  );

  Ok(workflow)
}
