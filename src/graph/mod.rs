// src/graph/mod.rs

//! Dependency graph scheduling and execution.
//!
//! - [`task_graph`] holds [`TaskGraph`], the public building and execution
//!   API.
//! - [`node`] defines node handles and per-node state.
//! - [`pool`] stores nodes in a growable slot array with a free list.
//! - [`scheduler`] is the coordinator that decides when nodes are eligible.
//! - [`worker`] owns the persistent worker threads and their queues.
//! - [`report`] contains per-pass results.
//! - [`validate`] provides the optional cycle check.

pub mod node;
pub mod report;
pub mod task_graph;

pub(crate) mod pool;
pub(crate) mod scheduler;
pub(crate) mod validate;
pub(crate) mod worker;

pub use node::{NodeId, NodeState};
pub use report::{ExecutionReport, TaskFailure};
pub use task_graph::{GraphState, TaskGraph};
