use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use studioflow_executor::{
  ChannelNotifier, ExecutionEvent, ExecutorConfig, Orchestrator, RunOutcome,
};
use studioflow_graph::{GraphSnapshot, InvocationMode, Severity, validate};
use studioflow_provider::{HttpClientConfig, HttpModelClient};

/// Studioflow - run generative-media workflow graphs
#[derive(Parser)]
#[command(name = "studioflow")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to a JSON config file
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Print the execution order of a graph
  Plan {
    /// Path to the graph file (JSON), or `-` for stdin
    graph_file: PathBuf,
  },

  /// Report authoring problems in a graph
  Validate {
    /// Path to the graph file (JSON), or `-` for stdin
    graph_file: PathBuf,
  },

  /// Execute a graph against the model service
  Run {
    /// Path to the graph file (JSON), or `-` for stdin
    graph_file: PathBuf,

    /// Invocation mode for nodes that do not set one
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    #[arg(long, env = "STUDIOFLOW_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "STUDIOFLOW_QUEUE_URL")]
    queue_url: Option<String>,

    #[arg(long, env = "STUDIOFLOW_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
  },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
  Sync,
  Queue,
}

impl From<ModeArg> for InvocationMode {
  fn from(mode: ModeArg) -> Self {
    match mode {
      ModeArg::Sync => InvocationMode::Sync,
      ModeArg::Queue => InvocationMode::Queue,
    }
  }
}

/// Contents of the `--config` file.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct FileConfig {
  executor: ExecutorConfig,
  http: HttpClientConfig,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();
  let config = load_config(cli.config.as_deref())?;

  match cli.command {
    Commands::Plan { graph_file } => plan(&graph_file),
    Commands::Validate { graph_file } => check(&graph_file),
    Commands::Run {
      graph_file,
      mode,
      base_url,
      queue_url,
      api_key,
    } => {
      let mut config = config;
      if let Some(mode) = mode {
        config.executor.default_mode = mode.into();
      }
      if let Some(base_url) = base_url {
        config.http.base_url = base_url;
      }
      if let Some(queue_url) = queue_url {
        config.http.queue_url = queue_url;
      }
      if api_key.is_some() {
        config.http.api_key = api_key;
      }

      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run(&graph_file, config))
    }
  }
}

fn load_config(path: Option<&Path>) -> Result<FileConfig> {
  let Some(path) = path else {
    return Ok(FileConfig::default());
  };
  let content = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read config file: {}", path.display()))?;
  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse config file: {}", path.display()))
}

fn load_graph(path: &Path) -> Result<GraphSnapshot> {
  let content = if path.as_os_str() == "-" {
    let mut buf = String::new();
    io::stdin()
      .read_to_string(&mut buf)
      .context("failed to read graph from stdin")?;
    buf
  } else {
    std::fs::read_to_string(path)
      .with_context(|| format!("failed to read graph file: {}", path.display()))?
  };

  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse graph file: {}", path.display()))
}

fn plan(graph_file: &Path) -> Result<()> {
  let snapshot = load_graph(graph_file)?;
  let ordered = snapshot
    .execution_order()
    .context("graph cannot be scheduled")?;

  let ids: Vec<&str> = ordered
    .iter()
    .filter(|n| !n.is_annotation())
    .map(|n| n.id.as_str())
    .collect();
  println!("{}", serde_json::to_string_pretty(&ids)?);
  Ok(())
}

fn check(graph_file: &Path) -> Result<()> {
  let snapshot = load_graph(graph_file)?;
  let report = validate(&snapshot);

  for issue in &report.issues {
    match issue.severity() {
      Severity::Error => error!(node_id = ?issue.node_id(), "{issue}"),
      Severity::Warning => warn!(node_id = ?issue.node_id(), "{issue}"),
    }
  }

  if !report.is_valid() {
    bail!("graph has {} issue(s)", report.issues.len());
  }
  info!(warnings = report.issues.len(), "graph_valid");
  Ok(())
}

async fn run(graph_file: &Path, config: FileConfig) -> Result<()> {
  let snapshot = load_graph(graph_file)?;
  let client = HttpModelClient::new(config.http).context("failed to create http client")?;
  let (notifier, mut events) = ChannelNotifier::channel();
  let orchestrator =
    Orchestrator::new(Arc::new(client), config.executor).with_notifier(notifier);

  let reporter = tokio::spawn(async move {
    while let Some(event) = events.recv().await {
      report_event(&event);
    }
  });

  let cancel = CancellationToken::new();
  let on_interrupt = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("interrupted, cancelling run");
      on_interrupt.cancel();
    }
  });

  let record = orchestrator.execute(&snapshot, cancel).await;
  // Closes the event channel so the reporter drains and exits.
  drop(orchestrator);
  if let Err(e) = reporter.await {
    warn!(error = %e, "event reporter stopped");
  }
  println!("{}", serde_json::to_string_pretty(&record)?);

  if record.status == RunOutcome::Failed {
    bail!("run {} failed", record.id);
  }
  Ok(())
}

fn report_event(event: &ExecutionEvent) {
  match event {
    ExecutionEvent::NodeProgress {
      node_id,
      status,
      attempts,
      progress,
      ..
    } => info!(
      node_id = %node_id,
      status = status.as_str(),
      attempts,
      progress = %format!("{:.0}%", progress * 100.0),
      "node_progress"
    ),
    ExecutionEvent::NodeFailed {
      node_id,
      error,
      cancelled,
      ..
    } => warn!(node_id = %node_id, cancelled, error = %error, "node_failed"),
    other => match serde_json::to_string(other) {
      Ok(json) => debug!(event = %json, "execution_event"),
      Err(e) => warn!(error = %e, "failed to encode execution event"),
    },
  }
}
