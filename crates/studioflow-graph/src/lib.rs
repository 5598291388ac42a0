//! Studioflow Graph
//!
//! Graph snapshot types and everything needed to decide *what* runs and in
//! which order. A snapshot is a list of nodes and a list of edges; an edge
//! carries the source node's output into a named input slot of the target.
//!
//! - [`GraphStore`] hands out snapshots; [`InMemoryGraphStore`] is the stock store
//! - [`order`] computes a deterministic topological order or reports a cycle
//! - [`validate`] reports authoring mistakes without blocking a run

mod edge;
mod error;
mod graph;
mod node;
mod scheduler;
mod snapshot;
mod store;
mod validation;

pub use edge::Edge;
pub use error::GraphError;
pub use graph::Graph;
pub use node::{CombineMode, DEFAULT_INPUT_SLOT, InvocationConfig, InvocationMode, Node, NodeKind};
pub use scheduler::order;
pub use snapshot::GraphSnapshot;
pub use store::{GraphStore, InMemoryGraphStore};
pub use validation::{Severity, ValidationIssue, ValidationReport, validate};
