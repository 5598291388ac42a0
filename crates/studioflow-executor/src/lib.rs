//! Studioflow Executor
//!
//! Runs a graph snapshot to completion, one node at a time in topological
//! order, and publishes every step through an [`ExecutionContext`].
//!
//! The entry point is [`Orchestrator::execute`]. Lower-level pieces are
//! exported for embedding and tests: [`resolve_inputs`] builds a node's
//! inputs, [`NodeExecutor`] runs a single node.

mod config;
mod context;
mod error;
mod events;
mod executors;
mod input;
mod orchestrator;
mod run;

pub use config::ExecutorConfig;
pub use context::{ExecutionContext, ExecutionState, LogEntry, LogLevel, RunStatus};
pub use error::ExecutionError;
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use executors::{NodeExecutor, combine};
pub use input::resolve_inputs;
pub use orchestrator::Orchestrator;
pub use run::{Run, RunOutcome, RunRecord};
