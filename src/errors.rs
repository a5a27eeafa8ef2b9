// src/errors.rs

//! Crate-wide error types and aliases.

use thiserror::Error;

use crate::graph::{ExecutionReport, NodeId, TaskFailure};

/// Errors produced when invoking a [`Task`](crate::task::Task) or
/// [`AnyTask`](crate::task::AnyTask).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("task has no bound callable")]
    Unbound,

    #[error("bound object of type `{0}` was dropped before the task ran")]
    TargetDropped(&'static str),

    #[error("signature mismatch: task is bound as `{expected}` but was called as `{found}`")]
    SignatureMismatch { expected: String, found: String },

    #[error("task panicked: {0}")]
    Panicked(String),
}

#[derive(Error, Debug)]
pub enum TaskGraphError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error("graph is executing; topology cannot change until the pass completes")]
    Busy,

    #[error("worker pool is stopped; call start() before executing")]
    Stopped,

    #[error("stale or unknown node handle {0}")]
    InvalidNode(NodeId),

    #[error("node {0} cannot depend on itself")]
    SelfDependency(NodeId),

    /// Some nodes were never reached, usually because of a cycle. Failures
    /// from the nodes that did run are carried along.
    #[error(
        "execution stalled: {pending} node(s) never had their parents complete ({} task(s) failed)",
        .failures.len()
    )]
    Stalled {
        pending: usize,
        failures: Vec<TaskFailure>,
    },

    #[error("{} task(s) failed during execution", .failures.len())]
    TaskFailed {
        failures: Vec<TaskFailure>,
        report: ExecutionReport,
    },

    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskGraphError>;
