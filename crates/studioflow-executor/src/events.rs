//! Run events.
//!
//! The [`crate::ExecutionContext`] holds the latest state of a run; events
//! describe each transition exactly once, in order. They serialize as tagged
//! objects (`{"type": "node_progress", ...}`) so they can be streamed as JSON
//! lines.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use studioflow_provider::JobState;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::run::RunRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionEvent {
  RunStarted {
    run_id: Uuid,
    started_at: DateTime<Utc>,
  },

  /// The graph was ordered. Annotations are left out of `order`.
  RunPlanned { run_id: Uuid, order: Vec<String> },

  NodeStarted {
    run_id: Uuid,
    node_id: String,
    kind: String,
  },

  /// One status poll of a queued job.
  NodeProgress {
    run_id: Uuid,
    node_id: String,
    request_id: String,
    status: JobState,
    attempts: u32,
    /// Same value the context publishes, capped below 1.0.
    progress: f64,
  },

  NodeCompleted {
    run_id: Uuid,
    node_id: String,
    output: Value,
  },

  NodeFailed {
    run_id: Uuid,
    node_id: String,
    error: String,
    cancelled: bool,
  },

  /// Last event of every run, including runs whose graph could not be
  /// scheduled. `error` is set when the run failed.
  RunFinished {
    record: RunRecord,
    error: Option<String>,
  },
}

impl ExecutionEvent {
  pub fn run_id(&self) -> Uuid {
    match self {
      ExecutionEvent::RunStarted { run_id, .. }
      | ExecutionEvent::RunPlanned { run_id, .. }
      | ExecutionEvent::NodeStarted { run_id, .. }
      | ExecutionEvent::NodeProgress { run_id, .. }
      | ExecutionEvent::NodeCompleted { run_id, .. }
      | ExecutionEvent::NodeFailed { run_id, .. } => *run_id,
      ExecutionEvent::RunFinished { record, .. } => record.id,
    }
  }

  /// Node the event is about, if any.
  pub fn node_id(&self) -> Option<&str> {
    match self {
      ExecutionEvent::NodeStarted { node_id, .. }
      | ExecutionEvent::NodeProgress { node_id, .. }
      | ExecutionEvent::NodeCompleted { node_id, .. }
      | ExecutionEvent::NodeFailed { node_id, .. } => Some(node_id),
      _ => None,
    }
  }
}

/// Receives execution events.
///
/// Called inline from the orchestrator, including from inside the polling
/// loop; implementations must not block.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

impl<T: ExecutionNotifier + ?Sized> ExecutionNotifier for Arc<T> {
  fn notify(&self, event: ExecutionEvent) {
    (**self).notify(event)
  }
}

#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// Forwards events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }

  /// A notifier together with the receiving end of its channel.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<ExecutionEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Receiver may have been dropped.
    let _ = self.sender.send(event);
  }
}
