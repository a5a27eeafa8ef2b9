// src/graph/node.rs

//! Node handles and per-node state.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::errors::TaskError;
use crate::task::Task;

/// Opaque handle to a node in a [`TaskGraph`](super::TaskGraph).
///
/// Handles carry the generation of their slot; after
/// [`TaskGraph::clear`](super::TaskGraph::clear) every old handle is stale
/// and rejected with [`InvalidNode`](crate::errors::TaskGraphError::InvalidNode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

impl NodeId {
    /// Slot index inside the node pool.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// Public, read-only view of where a node is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Slot is not in use.
    Free,
    /// Bound to a task; not reached in the current (or last) pass.
    Bound,
    /// Placed on the ready list, waiting for its parents.
    Queued,
    /// Ran to completion (successfully or not) in the last pass.
    Done,
    /// Not run in the last pass because an ancestor failed.
    Skipped,
}

/// A task plus its frozen argument tuple, runnable without knowing either
/// type.
pub(crate) trait Job: Send + Sync {
    fn run(&self) -> Result<(), TaskError>;
}

pub(crate) struct BoundCall<A, R> {
    task: Task<A, R>,
    args: A,
}

impl<A, R> BoundCall<A, R> {
    pub(crate) fn new(task: Task<A, R>, args: A) -> Self {
        Self { task, args }
    }
}

impl<A, R> Job for BoundCall<A, R>
where
    A: Clone + Send + Sync + 'static,
    R: 'static,
{
    fn run(&self) -> Result<(), TaskError> {
        // Every pass sees the arguments captured at `add_task` time.
        self.task.execute(self.args.clone()).map(drop)
    }
}

/// One slot of the node pool.
///
/// Topology fields are only written under the pool's write lock, i.e.
/// between passes. The atomics are per-pass state shared with workers.
pub(crate) struct Node {
    pub(crate) generation: u32,
    pub(crate) in_use: bool,
    pub(crate) label: Option<String>,
    pub(crate) job: Option<Box<dyn Job>>,
    pub(crate) parents: Vec<usize>,
    pub(crate) children: Vec<usize>,
    pub(crate) parents_done: AtomicUsize,
    pub(crate) queued: AtomicBool,
    pub(crate) done: AtomicBool,
    pub(crate) skipped: AtomicBool,
    pub(crate) upstream_failed: AtomicBool,
}

impl Node {
    pub(crate) fn empty() -> Self {
        Self {
            generation: 0,
            in_use: false,
            label: None,
            job: None,
            parents: Vec::new(),
            children: Vec::new(),
            parents_done: AtomicUsize::new(0),
            queued: AtomicBool::new(false),
            done: AtomicBool::new(false),
            skipped: AtomicBool::new(false),
            upstream_failed: AtomicBool::new(false),
        }
    }

    /// All parents have reported completion for this pass.
    pub(crate) fn is_ready(&self) -> bool {
        self.parents_done.load(Ordering::Acquire) >= self.parents.len()
    }

    pub(crate) fn reset_pass_state(&self) {
        self.parents_done.store(0, Ordering::Relaxed);
        self.queued.store(false, Ordering::Relaxed);
        self.done.store(false, Ordering::Relaxed);
        self.skipped.store(false, Ordering::Relaxed);
        self.upstream_failed.store(false, Ordering::Relaxed);
    }

    /// Return the slot to the free state, dropping job, edges and label.
    pub(crate) fn release(&mut self) {
        self.in_use = false;
        self.generation = self.generation.wrapping_add(1);
        self.label = None;
        self.job = None;
        self.parents.clear();
        self.children.clear();
        self.reset_pass_state();
    }

    pub(crate) fn state(&self) -> NodeState {
        if !self.in_use {
            NodeState::Free
        } else if self.skipped.load(Ordering::Acquire) {
            NodeState::Skipped
        } else if self.done.load(Ordering::Acquire) {
            NodeState::Done
        } else if self.queued.load(Ordering::Acquire) {
            NodeState::Queued
        } else {
            NodeState::Bound
        }
    }

    pub(crate) fn display_name(&self, index: usize) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => format!("#{index}"),
        }
    }
}
