// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::WorkMode;

/// Default worker thread count when none is configured.
pub const DEFAULT_THREAD_COUNT: usize = 4;

/// Upper bound accepted for `thread_count`.
pub const MAX_THREAD_COUNT: usize = 256;

/// Settings for a [`TaskGraph`](crate::graph::TaskGraph).
///
/// Read from the `[graph]` section of a workload file, or built in code:
///
/// ```toml
/// [graph]
/// node_capacity = 256
/// thread_count = 8
/// check_cycles = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GraphConfig {
    /// Node slots preallocated up front. The pool doubles when exhausted.
    #[serde(default = "default_node_capacity")]
    pub node_capacity: usize,

    /// Number of persistent worker threads.
    #[serde(default = "default_thread_count")]
    pub thread_count: usize,

    /// Run a cycle check before every pass and fail with `DagCycle`
    /// instead of detecting the stall afterwards.
    #[serde(default)]
    pub check_cycles: bool,

    /// Worker threads are named `<thread_name>-<index>`.
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

fn default_node_capacity() -> usize {
    64
}

fn default_thread_count() -> usize {
    DEFAULT_THREAD_COUNT
}

fn default_thread_name() -> String {
    "taskgraph-worker".to_string()
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            node_capacity: default_node_capacity(),
            thread_count: default_thread_count(),
            check_cycles: false,
            thread_name: default_thread_name(),
        }
    }
}

/// Top-level workload file as read from TOML, before validation.
///
/// ```toml
/// [graph]
/// thread_count = 4
///
/// [task.generate]
/// work_us = 500
///
/// [task.mesh]
/// work_us = 2000
/// after = ["generate"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawWorkloadFile {
    #[serde(default)]
    pub graph: GraphConfig,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskSpec>,
}

/// A validated workload: every `after` reference exists and the tasks form
/// a DAG. Obtain one through `TryFrom<RawWorkloadFile>` or
/// [`load_and_validate`](crate::config::load_and_validate).
#[derive(Debug, Clone)]
pub struct WorkloadFile {
    pub graph: GraphConfig,
    pub task: BTreeMap<String, TaskSpec>,
}

impl WorkloadFile {
    pub(crate) fn new_unchecked(graph: GraphConfig, task: BTreeMap<String, TaskSpec>) -> Self {
        Self { graph, task }
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskSpec {
    /// Simulated work per frame, in microseconds.
    #[serde(default)]
    pub work_us: u64,

    /// `"spin"` (default) or `"sleep"`.
    #[serde(default)]
    pub mode: WorkMode,

    /// Dependency list: this task waits for all tasks listed here.
    #[serde(default)]
    pub after: Vec<String>,
}
