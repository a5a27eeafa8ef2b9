// src/graph/report.rs

//! Per-pass execution results.

use std::time::Duration;

use crate::errors::TaskError;
use crate::graph::node::NodeId;

/// Summary of one [`TaskGraph::execute`](super::TaskGraph::execute) pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// 1-based pass counter for this graph.
    pub pass: u64,
    /// In-use nodes when the pass started.
    pub nodes: usize,
    /// Nodes that were handed to a worker and ran.
    pub executed: usize,
    /// Nodes not run because an ancestor failed.
    pub skipped: usize,
    /// Wall time from seeding to the completion barrier.
    pub elapsed: Duration,
}

/// A node whose task returned an error or panicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub node: NodeId,
    pub label: Option<String>,
    pub error: TaskError,
}
