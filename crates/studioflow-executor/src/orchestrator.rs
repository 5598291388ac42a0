//! Run orchestration.
//!
//! A run takes one snapshot of the graph, orders it, and executes the nodes
//! strictly one after another. The first node failure aborts the rest of the
//! run; partial results are kept in the run record.

use std::sync::Arc;

use studioflow_graph::{Edge, GraphStore, Node, validate};
use studioflow_provider::{ModelClient, PollProgress, ProviderAdapter};
use tokio_util::sync::CancellationToken;
use tracing::{Span, error, info, instrument, warn};

use crate::config::ExecutorConfig;
use crate::context::{ExecutionContext, LogLevel, RunStatus};
use crate::error::ExecutionError;
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};
use crate::executors::NodeExecutor;
use crate::input::resolve_inputs;
use crate::run::{Run, RunOutcome, RunRecord};

/// Executes graphs and publishes their progress.
///
/// One run at a time per orchestrator; concurrent `execute` calls would
/// interleave their writes to the shared context.
pub struct Orchestrator<N: ExecutionNotifier = NoopNotifier> {
  executor: NodeExecutor,
  context: ExecutionContext,
  notifier: N,
}

impl Orchestrator<NoopNotifier> {
  pub fn new(client: Arc<dyn ModelClient>, config: ExecutorConfig) -> Self {
    let adapter = ProviderAdapter::new(client, config.poll);
    Self {
      executor: NodeExecutor::new(adapter, config.default_mode),
      context: ExecutionContext::new(config.history_limit),
      notifier: NoopNotifier,
    }
  }
}

impl<N: ExecutionNotifier> Orchestrator<N> {
  /// Replace the notifier.
  pub fn with_notifier<M: ExecutionNotifier>(self, notifier: M) -> Orchestrator<M> {
    Orchestrator {
      executor: self.executor,
      context: self.context,
      notifier,
    }
  }

  /// Replace the execution context, e.g. to share one with a UI.
  pub fn with_context(mut self, context: ExecutionContext) -> Self {
    self.context = context;
    self
  }

  pub fn context(&self) -> &ExecutionContext {
    &self.context
  }

  /// Execute the graph currently held by `store`.
  ///
  /// Never fails: every outcome, including an unschedulable graph, ends in
  /// a [`RunRecord`] that is also appended to the context's history.
  #[instrument(name = "workflow_execute", skip_all, fields(run_id = tracing::field::Empty))]
  pub async fn execute(&self, store: &dyn GraphStore, cancel: CancellationToken) -> RunRecord {
    let mut run = Run::start();
    let run_id = run.id;
    Span::current().record("run_id", tracing::field::display(run_id));

    self.context.begin_run();
    info!(run_id = %run_id, "run_started");
    self.notifier.notify(ExecutionEvent::RunStarted {
      run_id,
      started_at: run.started_at,
    });
    self
      .context
      .log(LogLevel::Info, None, "Starting workflow execution");

    let snapshot = store.snapshot();
    for issue in validate(&snapshot).issues {
      self
        .context
        .log(LogLevel::Warn, issue.node_id(), issue.to_string());
    }

    let ordered = match snapshot.execution_order() {
      Ok(ordered) => ordered,
      Err(e) => {
        let err = ExecutionError::from(e);
        return self.fail(run, &err);
      }
    };
    let ordered: Vec<&Node> = ordered.into_iter().filter(|n| !n.is_annotation()).collect();

    let names: Vec<&str> = ordered.iter().map(|n| n.display_name()).collect();
    self.context.log(
      LogLevel::Info,
      None,
      format!("Execution order: {}", names.join(" → ")),
    );
    self.notifier.notify(ExecutionEvent::RunPlanned {
      run_id,
      order: ordered.iter().map(|n| n.id.clone()).collect(),
    });

    for node in ordered {
      if let Err(err) = self.run_node(&mut run, node, &snapshot.edges, &cancel).await {
        return self.fail(run, &err);
      }
    }

    self
      .context
      .log(LogLevel::Info, None, "Workflow completed successfully");
    info!(run_id = %run_id, nodes = run.results.len(), "run_completed");

    let record = run.finish(RunOutcome::Success);
    self
      .context
      .finish_run(RunStatus::Succeeded, record.clone());
    self.notifier.notify(ExecutionEvent::RunFinished {
      record: record.clone(),
      error: None,
    });
    record
  }

  #[instrument(name = "node_execute", skip_all, fields(node_id = %node.id, kind = node.kind.type_name()))]
  async fn run_node(
    &self,
    run: &mut Run,
    node: &Node,
    edges: &[Edge],
    cancel: &CancellationToken,
  ) -> Result<(), ExecutionError> {
    let name = node.display_name();
    self.context.set_current_node(Some(&node.id));

    if cancel.is_cancelled() {
      return Err(self.node_failed(run, node, ExecutionError::Cancelled {
        node_id: node.id.clone(),
      }));
    }

    let run_id = run.id;
    self.notifier.notify(ExecutionEvent::NodeStarted {
      run_id,
      node_id: node.id.clone(),
      kind: node.kind.type_name().to_string(),
    });
    self
      .context
      .log(LogLevel::Info, Some(&node.id), format!("Executing {name}..."));
    self.context.set_progress(&node.id, 0.0);

    let inputs = resolve_inputs(node, edges, &run.results);
    let on_progress = |progress: &PollProgress| {
      let fraction = progress.fraction();
      self.context.set_progress(&node.id, fraction);
      self.notifier.notify(ExecutionEvent::NodeProgress {
        run_id,
        node_id: node.id.clone(),
        request_id: progress.request_id.clone(),
        status: progress.status.clone(),
        attempts: progress.attempts,
        progress: fraction,
      });
    };

    match self.executor.execute(node, inputs, on_progress, cancel).await {
      Ok(output) => {
        self.context.record_result(&node.id, output.clone());
        self
          .context
          .log(LogLevel::Info, Some(&node.id), format!("{name} completed"));
        self.notifier.notify(ExecutionEvent::NodeCompleted {
          run_id,
          node_id: node.id.clone(),
          output: output.clone(),
        });
        run.results.insert(node.id.clone(), output);
        Ok(())
      }
      Err(err) => Err(self.node_failed(run, node, err)),
    }
  }

  fn node_failed(&self, run: &mut Run, node: &Node, err: ExecutionError) -> ExecutionError {
    let message = err.to_string();
    let level = if err.is_cancelled() {
      LogLevel::Warn
    } else {
      LogLevel::Error
    };

    self.context.record_error(&node.id, message.clone());
    self.context.log(
      level,
      Some(&node.id),
      format!("{} failed: {message}", node.display_name()),
    );
    self.notifier.notify(ExecutionEvent::NodeFailed {
      run_id: run.id,
      node_id: node.id.clone(),
      error: message.clone(),
      cancelled: err.is_cancelled(),
    });
    run.errors.insert(node.id.clone(), message);
    err
  }

  fn fail(&self, run: Run, err: &ExecutionError) -> RunRecord {
    let run_id = run.id;
    let message = err.to_string();
    if err.is_cancelled() {
      warn!(run_id = %run_id, "run_cancelled");
    } else {
      error!(run_id = %run_id, error = %message, "run_failed");
    }

    self
      .context
      .log(LogLevel::Error, None, format!("Workflow failed: {message}"));

    let record = run.finish(RunOutcome::Failed);
    self.context.finish_run(RunStatus::Failed, record.clone());
    self.notifier.notify(ExecutionEvent::RunFinished {
      record: record.clone(),
      error: Some(message),
    });
    record
  }
}
