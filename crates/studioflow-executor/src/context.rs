//! Observable execution state.
//!
//! [`ExecutionContext`] is the only mutable state shared between a run and
//! its observers. The orchestrator writes it; anyone may [`subscribe`] and
//! read the latest [`ExecutionState`] without blocking the writer.
//!
//! [`subscribe`]: ExecutionContext::subscribe

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::run::RunRecord;

/// Lifecycle of the most recent run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
  #[default]
  Idle,
  Running,
  Succeeded,
  Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
  Info,
  Warn,
  Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
  pub timestamp: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub node_id: Option<String>,
  pub message: String,
  pub level: LogLevel,
}

/// Snapshot of everything an observer can see.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionState {
  pub status: RunStatus,
  pub current_node: Option<String>,
  /// Per-node progress in `[0, 1]`.
  pub progress: BTreeMap<String, f64>,
  pub results: Map<String, Value>,
  pub errors: BTreeMap<String, String>,
  pub log: Vec<LogEntry>,
  /// Finished runs, oldest first.
  pub history: VecDeque<RunRecord>,
}

impl ExecutionState {
  pub fn is_running(&self) -> bool {
    self.status == RunStatus::Running
  }

  fn is_finished(&self, node_id: &str) -> bool {
    self.results.contains_key(node_id) || self.errors.contains_key(node_id)
  }
}

/// Publishes [`ExecutionState`] to subscribers.
#[derive(Debug)]
pub struct ExecutionContext {
  state: watch::Sender<ExecutionState>,
  history_limit: usize,
}

impl ExecutionContext {
  pub fn new(history_limit: usize) -> Self {
    let (state, _) = watch::channel(ExecutionState::default());
    Self {
      state,
      history_limit,
    }
  }

  /// Receiver that always observes the latest state.
  pub fn subscribe(&self) -> watch::Receiver<ExecutionState> {
    self.state.subscribe()
  }

  /// Copy of the current state.
  pub fn snapshot(&self) -> ExecutionState {
    self.state.borrow().clone()
  }

  /// Reset per-run state and mark a run as started. History is kept.
  pub fn begin_run(&self) {
    self.state.send_modify(|s| {
      reset(s);
      s.status = RunStatus::Running;
    });
  }

  pub fn set_current_node(&self, node_id: Option<&str>) {
    self
      .state
      .send_modify(|s| s.current_node = node_id.map(str::to_string));
  }

  /// Set a node's progress.
  ///
  /// Progress never decreases, and is frozen once the node has a result or
  /// an error.
  pub fn set_progress(&self, node_id: &str, value: f64) {
    self.state.send_if_modified(|s| {
      if s.is_finished(node_id) {
        return false;
      }
      let value = value.clamp(0.0, 1.0);
      let current = s.progress.entry(node_id.to_string()).or_insert(0.0);
      if value > *current {
        *current = value;
      }
      true
    });
  }

  pub fn record_result(&self, node_id: &str, value: Value) {
    self.state.send_modify(|s| {
      s.progress.insert(node_id.to_string(), 1.0);
      s.results.insert(node_id.to_string(), value);
    });
  }

  pub fn record_error(&self, node_id: &str, message: impl Into<String>) {
    self
      .state
      .send_modify(|s| {
        s.errors.insert(node_id.to_string(), message.into());
      });
  }

  /// Append a log entry and mirror it to `tracing`.
  pub fn log(&self, level: LogLevel, node_id: Option<&str>, message: impl Into<String>) {
    let message = message.into();
    match level {
      LogLevel::Info => info!(node_id = node_id.unwrap_or_default(), "{message}"),
      LogLevel::Warn => warn!(node_id = node_id.unwrap_or_default(), "{message}"),
      LogLevel::Error => error!(node_id = node_id.unwrap_or_default(), "{message}"),
    }

    let entry = LogEntry {
      timestamp: Utc::now(),
      node_id: node_id.map(str::to_string),
      message,
      level,
    };
    self.state.send_modify(|s| s.log.push(entry));
  }

  /// Mark the run finished and append its record to the history.
  pub fn finish_run(&self, status: RunStatus, record: RunRecord) {
    let limit = self.history_limit;
    self.state.send_modify(|s| {
      s.status = status;
      s.current_node = None;
      s.history.push_back(record);
      while s.history.len() > limit {
        s.history.pop_front();
      }
    });
  }

  /// Clear progress, results, errors, and log. History is kept.
  pub fn clear(&self) {
    self.state.send_modify(|s| {
      reset(s);
      s.status = RunStatus::Idle;
    });
  }

  /// Remove the recorded error of a single node.
  pub fn clear_node_error(&self, node_id: &str) {
    self
      .state
      .send_if_modified(|s| s.errors.remove(node_id).is_some());
  }
}

impl Default for ExecutionContext {
  fn default() -> Self {
    Self::new(crate::ExecutorConfig::default().history_limit)
  }
}

fn reset(state: &mut ExecutionState) {
  state.current_node = None;
  state.progress.clear();
  state.results.clear();
  state.errors.clear();
  state.log.clear();
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::run::{Run, RunOutcome};
  use serde_json::json;

  #[test]
  fn test_progress_is_monotonic_and_frozen() {
    let ctx = ExecutionContext::default();
    ctx.set_progress("gen", 0.0);
    ctx.set_progress("gen", 0.4);
    ctx.set_progress("gen", 0.2);
    assert_eq!(ctx.snapshot().progress["gen"], 0.4);

    ctx.record_error("gen", "boom");
    ctx.set_progress("gen", 0.9);
    assert_eq!(ctx.snapshot().progress["gen"], 0.4);

    ctx.record_result("p", json!("x"));
    ctx.set_progress("p", 0.5);
    assert_eq!(ctx.snapshot().progress["p"], 1.0);
  }

  #[test]
  fn test_history_is_bounded_fifo() {
    let ctx = ExecutionContext::new(3);
    let mut ids = Vec::new();
    for _ in 0..5 {
      let record = Run::start().finish(RunOutcome::Success);
      ids.push(record.id);
      ctx.finish_run(RunStatus::Succeeded, record);
    }

    let history: Vec<_> = ctx.snapshot().history.iter().map(|r| r.id).collect();
    assert_eq!(history, ids[2..]);
  }

  #[test]
  fn test_clear_keeps_history() {
    let ctx = ExecutionContext::default();
    ctx.begin_run();
    ctx.record_result("p", json!(1));
    ctx.record_error("gen", "boom");
    ctx.log(LogLevel::Info, None, "hello");
    ctx.finish_run(RunStatus::Failed, Run::start().finish(RunOutcome::Failed));

    ctx.clear_node_error("gen");
    assert!(ctx.snapshot().errors.is_empty());
    assert_eq!(ctx.snapshot().results.len(), 1);

    ctx.clear();
    let state = ctx.snapshot();
    assert_eq!(state.status, RunStatus::Idle);
    assert!(state.results.is_empty());
    assert!(state.log.is_empty());
    assert_eq!(state.history.len(), 1);
  }

  #[tokio::test]
  async fn test_subscribers_see_updates() {
    let ctx = ExecutionContext::default();
    let mut rx = ctx.subscribe();

    ctx.begin_run();
    rx.changed().await.unwrap();
    assert!(rx.borrow_and_update().is_running());

    ctx.log(LogLevel::Warn, Some("gen"), "slow model");
    rx.changed().await.unwrap();
    let state = rx.borrow_and_update().clone();
    assert_eq!(state.log[0].level, LogLevel::Warn);
    assert_eq!(state.log[0].node_id.as_deref(), Some("gen"));
  }
}
