// src/graph/worker.rs

//! Persistent worker threads.
//!
//! Each worker owns a private FIFO of node indices guarded by its own mutex,
//! so dispatching to one worker never contends with another. Workers sleep
//! on a condvar while their queue is empty and report every finished node to
//! the shared [`PassTracker`], which is what the coordinator blocks on.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard};
use std::thread::{self, JoinHandle};

use tracing::{debug, trace};

use crate::errors::{Result, TaskError, TaskGraphError};
use crate::graph::pool::NodePool;

pub(crate) type SharedPool = Arc<RwLock<NodePool>>;

/// Lock a mutex, ignoring poisoning: task code never runs while one of
/// these locks is held, so the protected data stays consistent.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn read(pool: &RwLock<NodePool>) -> RwLockReadGuard<'_, NodePool> {
    pool.read().unwrap_or_else(PoisonError::into_inner)
}

/// Per-worker queue and status flags.
struct WorkerSlot {
    queue: Mutex<VecDeque<usize>>,
    wake: Condvar,
    /// Mirror of `queue.len()`, readable without taking the lock.
    queued: AtomicUsize,
    processing: AtomicBool,
}

impl WorkerSlot {
    fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            wake: Condvar::new(),
            queued: AtomicUsize::new(0),
            processing: AtomicBool::new(false),
        }
    }

    fn is_idle(&self) -> bool {
        self.queued.load(Ordering::Acquire) == 0 && !self.processing.load(Ordering::Acquire)
    }
}

/// Completion bookkeeping for the pass currently in progress.
#[derive(Debug, Default)]
pub(crate) struct PassState {
    /// Nodes handed to a worker and not yet finished.
    pub(crate) in_flight: usize,
    /// Nodes finished in this pass.
    pub(crate) completed: usize,
    /// Slot index and error of every node that failed in this pass.
    pub(crate) failures: Vec<(usize, TaskError)>,
}

#[derive(Default)]
pub(crate) struct PassTracker {
    state: Mutex<PassState>,
    changed: Condvar,
}

impl PassTracker {
    pub(crate) fn reset(&self) {
        *lock(&self.state) = PassState::default();
    }

    pub(crate) fn completed(&self) -> usize {
        lock(&self.state).completed
    }

    fn begin(&self) {
        lock(&self.state).in_flight += 1;
    }

    fn finish(&self, index: usize, outcome: std::result::Result<(), TaskError>) {
        let mut state = lock(&self.state);
        state.in_flight -= 1;
        state.completed += 1;
        if let Err(err) = outcome {
            state.failures.push((index, err));
        }
        drop(state);
        self.changed.notify_all();
    }

    /// Block until a node completes after `seen` completions were observed,
    /// or until nothing is in flight. Returns `(completed, in_flight)`.
    pub(crate) fn wait_for_progress(&self, seen: usize) -> (usize, usize) {
        let state = lock(&self.state);
        let state = self
            .changed
            .wait_while(state, |s| s.completed == seen && s.in_flight > 0)
            .unwrap_or_else(PoisonError::into_inner);
        (state.completed, state.in_flight)
    }

    /// Completion barrier: block until every dispatched node has finished.
    pub(crate) fn wait_idle(&self) {
        let state = lock(&self.state);
        let _state = self
            .changed
            .wait_while(state, |s| s.in_flight > 0)
            .unwrap_or_else(PoisonError::into_inner);
    }

    pub(crate) fn take_failures(&self) -> Vec<(usize, TaskError)> {
        std::mem::take(&mut lock(&self.state).failures)
    }
}

struct PoolShared {
    workers: Vec<WorkerSlot>,
    shutdown: AtomicBool,
    tracker: PassTracker,
}

/// A fixed-size set of worker threads bound to one node pool.
pub(crate) struct WorkerPool {
    shared: Arc<PoolShared>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `threads` workers named `<name>-<index>`.
    pub(crate) fn spawn(threads: usize, name: &str, nodes: &SharedPool) -> Result<Self> {
        if threads == 0 {
            return Err(TaskGraphError::ConfigError(
                "worker pool needs at least one thread".to_string(),
            ));
        }

        let shared = Arc::new(PoolShared {
            workers: (0..threads).map(|_| WorkerSlot::new()).collect(),
            shutdown: AtomicBool::new(false),
            tracker: PassTracker::default(),
        });

        let mut pool = Self {
            shared,
            handles: Vec::with_capacity(threads),
        };

        for index in 0..threads {
            let shared = Arc::clone(&pool.shared);
            let nodes = Arc::clone(nodes);
            let spawned = thread::Builder::new()
                .name(format!("{name}-{index}"))
                .spawn(move || worker_loop(index, &shared, &nodes));

            match spawned {
                Ok(handle) => pool.handles.push(handle),
                Err(err) => {
                    // Join whatever already started before reporting.
                    pool.shutdown();
                    return Err(TaskGraphError::WorkerSpawn(err));
                }
            }
        }

        debug!(threads, "worker pool started");
        Ok(pool)
    }

    pub(crate) fn len(&self) -> usize {
        self.shared.workers.len()
    }

    pub(crate) fn tracker(&self) -> &PassTracker {
        &self.shared.tracker
    }

    /// Every worker has an empty queue and is not running a node.
    pub(crate) fn is_idle(&self) -> bool {
        self.shared.workers.iter().all(WorkerSlot::is_idle)
    }

    /// Hand a ready node to the worker with the shortest queue.
    ///
    /// Ties prefer a worker that is not currently processing, then the
    /// lowest index.
    pub(crate) fn dispatch(&self, index: usize) -> usize {
        let target = self
            .shared
            .workers
            .iter()
            .enumerate()
            .min_by_key(|(_, w)| {
                (
                    w.queued.load(Ordering::Acquire),
                    w.processing.load(Ordering::Acquire),
                )
            })
            .map_or(0, |(i, _)| i);
        let slot = &self.shared.workers[target];

        self.shared.tracker.begin();
        {
            let mut queue = lock(&slot.queue);
            queue.push_back(index);
            slot.queued.fetch_add(1, Ordering::AcqRel);
        }
        slot.wake.notify_one();

        trace!(node = index, worker = target, "dispatched");
        target
    }

    /// Signal every worker to exit and join them.
    pub(crate) fn shutdown(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        for slot in &self.shared.workers {
            // Taking the lock orders the flag store before the wakeup.
            let _queue = lock(&slot.queue);
            slot.wake.notify_all();
        }

        for handle in self.handles.drain(..) {
            let name = handle.thread().name().map(str::to_owned);
            if handle.join().is_err() {
                debug!(worker = ?name, "worker thread exited with a panic");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            self.shutdown();
        }
    }
}

fn worker_loop(index: usize, shared: &PoolShared, nodes: &RwLock<NodePool>) {
    let slot = &shared.workers[index];
    trace!(worker = index, "worker started");

    loop {
        let next = {
            let mut queue = lock(&slot.queue);
            loop {
                if let Some(node) = queue.pop_front() {
                    slot.processing.store(true, Ordering::Release);
                    slot.queued.fetch_sub(1, Ordering::AcqRel);
                    break Some(node);
                }
                if shared.shutdown.load(Ordering::Acquire) {
                    break None;
                }
                queue = slot
                    .wake
                    .wait(queue)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        let Some(node) = next else {
            break;
        };

        let outcome = run_node(nodes, node);
        slot.processing.store(false, Ordering::Release);
        shared.tracker.finish(node, outcome);
    }

    trace!(worker = index, "worker stopped");
}

/// Run one node and release its children.
///
/// Children are flagged before their counters move, so once the
/// coordinator sees a child as ready it also sees a failed parent.
fn run_node(nodes: &RwLock<NodePool>, index: usize) -> std::result::Result<(), TaskError> {
    let pool = read(nodes);
    let node = pool.slot(index);

    let outcome = match &node.job {
        Some(job) => panic::catch_unwind(AssertUnwindSafe(|| job.run()))
            .unwrap_or_else(|payload| Err(TaskError::Panicked(panic_message(payload.as_ref())))),
        None => Err(TaskError::Unbound),
    };

    match &outcome {
        Ok(()) => trace!(node = %node.display_name(index), "node finished"),
        Err(err) => {
            debug!(node = %node.display_name(index), error = %err, "node failed");
            for &child in &node.children {
                pool.slot(child).upstream_failed.store(true, Ordering::Release);
            }
        }
    }

    node.done.store(true, Ordering::Release);
    for &child in &node.children {
        pool.slot(child).parents_done.fetch_add(1, Ordering::AcqRel);
    }

    outcome
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
