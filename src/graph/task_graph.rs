// src/graph/task_graph.rs

use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use tracing::{debug, info};

use crate::config::GraphConfig;
use crate::errors::{Result, TaskGraphError};
use crate::graph::node::{BoundCall, NodeId, NodeState};
use crate::graph::pool::NodePool;
use crate::graph::report::ExecutionReport;
use crate::graph::scheduler::run_pass;
use crate::graph::validate::ensure_acyclic;
use crate::graph::worker::{SharedPool, WorkerPool, read};
use crate::task::Task;

/// Lifecycle of a [`TaskGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphState {
    /// Workers are running and no pass is in progress.
    Idle,
    /// `execute()` is running a pass.
    Executing,
    /// Workers were stopped; `start()` brings up a fresh pool.
    Stopped,
}

/// A dependency graph of tasks executed on a persistent worker pool.
///
/// Build the graph with [`add_task`](Self::add_task) and the wiring
/// helpers, then call [`execute`](Self::execute) once per frame. Nodes stay
/// in the graph and re-run on every `execute()` until
/// [`clear`](Self::clear) releases them.
///
/// The graph must be acyclic. Enable [`GraphConfig::check_cycles`] to have
/// `execute()` reject cycles up front; otherwise a cycle surfaces as
/// [`TaskGraphError::Stalled`] once the pass cannot make progress, along
/// with any task failures from the nodes that did run.
pub struct TaskGraph {
    config: GraphConfig,
    nodes: SharedPool,
    workers: Option<WorkerPool>,
    state: GraphState,
    passes: u64,
}

impl TaskGraph {
    /// Graph with room for `node_capacity` nodes and the default thread
    /// count.
    pub fn new(node_capacity: usize) -> Result<Self> {
        Self::from_config(GraphConfig {
            node_capacity,
            ..GraphConfig::default()
        })
    }

    pub fn with_threads(node_capacity: usize, thread_count: usize) -> Result<Self> {
        Self::from_config(GraphConfig {
            node_capacity,
            thread_count,
            ..GraphConfig::default()
        })
    }

    /// Preallocate the node pool and start the worker threads.
    pub fn from_config(config: GraphConfig) -> Result<Self> {
        config.validate()?;

        let nodes = Arc::new(RwLock::new(NodePool::with_capacity(config.node_capacity)));
        let workers = WorkerPool::spawn(config.thread_count, &config.thread_name, &nodes)?;

        info!(
            threads = config.thread_count,
            node_capacity = config.node_capacity,
            "task graph ready"
        );

        Ok(Self {
            config,
            nodes,
            workers: Some(workers),
            state: GraphState::Idle,
            passes: 0,
        })
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn state(&self) -> GraphState {
        self.state
    }

    /// `true` when no pass is in progress.
    pub fn is_done(&self) -> bool {
        self.state != GraphState::Executing
    }

    /// Number of nodes currently bound to a task.
    pub fn len(&self) -> usize {
        read(&self.nodes).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total node slots allocated so far. Never shrinks.
    pub fn capacity(&self) -> usize {
        read(&self.nodes).capacity()
    }

    /// Worker threads currently running (0 once stopped).
    pub fn thread_count(&self) -> usize {
        self.workers.as_ref().map_or(0, WorkerPool::len)
    }

    /// Add a node running `task` with `args`.
    ///
    /// `args` is captured now: every pass invokes the task with a clone of
    /// this value, whatever happens to the caller's copy afterwards.
    pub fn add_task<A, R>(&mut self, task: Task<A, R>, args: A) -> Result<NodeId>
    where
        A: Clone + Send + Sync + 'static,
        R: 'static,
    {
        self.add_task_with(task, args, &[], &[])
    }

    /// Add a node that runs after `parent`.
    pub fn add_task_after<A, R>(
        &mut self,
        task: Task<A, R>,
        args: A,
        parent: NodeId,
    ) -> Result<NodeId>
    where
        A: Clone + Send + Sync + 'static,
        R: 'static,
    {
        self.add_task_with(task, args, &[parent], &[])
    }

    /// Add a node wired after every node in `parents` and before every node
    /// in `children`.
    ///
    /// All handles are checked before the node is created, so a failed call
    /// leaves the graph unchanged.
    pub fn add_task_with<A, R>(
        &mut self,
        task: Task<A, R>,
        args: A,
        parents: &[NodeId],
        children: &[NodeId],
    ) -> Result<NodeId>
    where
        A: Clone + Send + Sync + 'static,
        R: 'static,
    {
        let mut pool = self.topology()?;

        let parents = resolve_all(&pool, parents)?;
        let children = resolve_all(&pool, children)?;

        let id = pool.allocate(Box::new(BoundCall::new(task, args)));
        for &parent in &parents {
            pool.link(parent, id.index);
        }
        for &child in &children {
            pool.link(id.index, child);
        }

        debug!(
            node = %id,
            parents = parents.len(),
            children = children.len(),
            "task added"
        );
        Ok(id)
    }

    /// Make `node` run after each of `parents`.
    pub fn add_parents(&mut self, node: NodeId, parents: &[NodeId]) -> Result<()> {
        let mut pool = self.topology()?;
        let index = pool.resolve(node)?;
        let parents = resolve_all(&pool, parents)?;

        if parents.contains(&index) {
            return Err(TaskGraphError::SelfDependency(node));
        }
        for parent in parents {
            pool.link(parent, index);
        }
        Ok(())
    }

    /// Make each of `children` run after `node`.
    pub fn add_children(&mut self, node: NodeId, children: &[NodeId]) -> Result<()> {
        let mut pool = self.topology()?;
        let index = pool.resolve(node)?;
        let children = resolve_all(&pool, children)?;

        if children.contains(&index) {
            return Err(TaskGraphError::SelfDependency(node));
        }
        for child in children {
            pool.link(index, child);
        }
        Ok(())
    }

    /// Attach a name used in logs and failure reports.
    pub fn set_label(&mut self, node: NodeId, label: impl Into<String>) -> Result<()> {
        let mut pool = self.topology()?;
        let index = pool.resolve(node)?;
        pool.slot_mut(index).label = Some(label.into());
        Ok(())
    }

    pub fn label(&self, node: NodeId) -> Result<Option<String>> {
        let pool = read(&self.nodes);
        let index = pool.resolve(node)?;
        Ok(pool.slot(index).label.clone())
    }

    pub fn parents_of(&self, node: NodeId) -> Result<Vec<NodeId>> {
        let pool = read(&self.nodes);
        let index = pool.resolve(node)?;
        Ok(pool.slot(index).parents.iter().map(|&p| pool.id_of(p)).collect())
    }

    pub fn children_of(&self, node: NodeId) -> Result<Vec<NodeId>> {
        let pool = read(&self.nodes);
        let index = pool.resolve(node)?;
        Ok(pool.slot(index).children.iter().map(|&c| pool.id_of(c)).collect())
    }

    /// Where `node` is in its lifecycle after the last pass.
    ///
    /// Stale handles report [`NodeState::Free`].
    pub fn node_state(&self, node: NodeId) -> NodeState {
        let pool = read(&self.nodes);
        match pool.resolve(node) {
            Ok(index) => pool.slot(index).state(),
            Err(_) => NodeState::Free,
        }
    }

    /// Run every node once, respecting dependencies, and block until all of
    /// them have finished.
    ///
    /// Task failures do not abort the pass: descendants of a failed node are
    /// skipped, everything else still runs, and the failures are returned as
    /// [`TaskGraphError::TaskFailed`] after the barrier.
    pub fn execute(&mut self) -> Result<ExecutionReport> {
        match self.state {
            GraphState::Stopped => return Err(TaskGraphError::Stopped),
            GraphState::Executing => return Err(TaskGraphError::Busy),
            GraphState::Idle => {}
        }
        let Some(workers) = self.workers.as_ref() else {
            return Err(TaskGraphError::Stopped);
        };

        let pool = read(&self.nodes);
        if self.config.check_cycles {
            ensure_acyclic(&pool)?;
        }

        self.passes += 1;
        self.state = GraphState::Executing;
        let result = run_pass(&pool, workers, self.passes);
        self.state = GraphState::Idle;

        result
    }

    /// Release every node so the pool can be refilled.
    ///
    /// Edges, labels and captured arguments are dropped along with the
    /// tasks, and every outstanding [`NodeId`] becomes stale. Callers must
    /// rebuild the topology they need after clearing.
    pub fn clear(&mut self) -> Result<()> {
        let mut pool = self.topology()?;
        let released = pool.len();
        pool.clear();
        debug!(released, capacity = pool.capacity(), "node pool cleared");
        Ok(())
    }

    /// Stop and join every worker thread. Idempotent.
    pub fn stop(&mut self) {
        if let Some(mut workers) = self.workers.take() {
            workers.shutdown();
            self.state = GraphState::Stopped;
            info!("task graph workers stopped");
        }
    }

    /// Bring up a fresh worker pool after [`stop`](Self::stop).
    ///
    /// Does nothing while workers are already running.
    pub fn start(&mut self) -> Result<()> {
        if self.workers.is_some() {
            return Ok(());
        }
        let workers = WorkerPool::spawn(
            self.config.thread_count,
            &self.config.thread_name,
            &self.nodes,
        )?;
        self.workers = Some(workers);
        self.state = GraphState::Idle;
        info!(threads = self.config.thread_count, "task graph workers restarted");
        Ok(())
    }

    /// Write access to the pool for topology changes.
    fn topology(&self) -> Result<RwLockWriteGuard<'_, NodePool>> {
        if self.state == GraphState::Executing {
            return Err(TaskGraphError::Busy);
        }
        Ok(self.nodes.write().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Drop for TaskGraph {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskGraph")
            .field("state", &self.state)
            .field("nodes", &self.len())
            .field("capacity", &self.capacity())
            .field("threads", &self.thread_count())
            .field("passes", &self.passes)
            .finish()
    }
}

fn resolve_all(pool: &NodePool, ids: &[NodeId]) -> Result<Vec<usize>> {
    ids.iter().map(|&id| pool.resolve(id)).collect()
}
