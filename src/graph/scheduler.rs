// src/graph/scheduler.rs

//! Coordinator side of a pass.
//!
//! The coordinator never runs tasks itself. It decides *when* a node is
//! eligible and hands it to a worker:
//!
//! 1. seed the ready list with parentless nodes,
//! 2. scan the ready list; dispatch every node whose parents have all
//!    completed and append its children to a discovered buffer (each child
//!    at most once, guarded by its `queued` flag),
//! 3. merge the discovered nodes into the ready list and scan again,
//!    blocking on the completion tracker whenever a scan makes no progress,
//! 4. once nothing is left to discover, wait for the completion barrier.

use std::sync::atomic::Ordering;
use std::time::Instant;

use tracing::{debug, trace, warn};

use crate::errors::{Result, TaskGraphError};
use crate::graph::node::Node;
use crate::graph::pool::NodePool;
use crate::graph::report::{ExecutionReport, TaskFailure};
use crate::graph::worker::WorkerPool;

/// Per-pass coordinator state.
struct Pass<'a> {
    pool: &'a NodePool,
    workers: &'a WorkerPool,
    ready: Vec<usize>,
    discovered: Vec<usize>,
    executed: usize,
    skipped: usize,
}

impl<'a> Pass<'a> {
    fn new(pool: &'a NodePool, workers: &'a WorkerPool) -> Self {
        Self {
            pool,
            workers,
            ready: Vec::new(),
            discovered: Vec::new(),
            executed: 0,
            skipped: 0,
        }
    }

    fn seed(&mut self) {
        for index in self.pool.roots() {
            self.pool.slot(index).queued.store(true, Ordering::Release);
            self.ready.push(index);
        }
        trace!(roots = self.ready.len(), "seeded ready list");
    }

    /// One scan over the ready list. Returns whether any node left it.
    fn scan(&mut self) -> bool {
        let pool = self.pool;
        let mut progressed = false;
        let mut waiting = Vec::with_capacity(self.ready.len());

        for index in std::mem::take(&mut self.ready) {
            let node = pool.slot(index);
            if !node.is_ready() {
                waiting.push(index);
                continue;
            }

            progressed = true;
            if node.upstream_failed.load(Ordering::Acquire) {
                self.skip(index, node);
            } else {
                self.workers.dispatch(index);
                self.executed += 1;
            }
            self.discover_children(node);
        }

        self.ready = waiting;
        self.ready.append(&mut self.discovered);
        progressed
    }

    /// Mark a node whose ancestor failed as skipped and release its
    /// children on its behalf.
    fn skip(&mut self, index: usize, node: &Node) {
        trace!(node = %node.display_name(index), "skipping; upstream task failed");
        node.skipped.store(true, Ordering::Release);
        node.done.store(true, Ordering::Release);
        for &child in &node.children {
            let child = self.pool.slot(child);
            child.upstream_failed.store(true, Ordering::Release);
            child.parents_done.fetch_add(1, Ordering::AcqRel);
        }
        self.skipped += 1;
    }

    fn discover_children(&mut self, node: &Node) {
        for &child in &node.children {
            if !self.pool.slot(child).queued.swap(true, Ordering::AcqRel) {
                self.discovered.push(child);
            }
        }
    }

    /// Drive scans until the ready list is empty or can never drain.
    fn drive(&mut self) {
        let workers = self.workers;
        let tracker = workers.tracker();

        loop {
            let seen = tracker.completed();
            if self.scan() {
                continue;
            }
            if self.ready.is_empty() {
                return;
            }

            // Nothing was eligible: wait for a worker to finish something.
            let (completed, in_flight) = tracker.wait_for_progress(seen);
            if completed == seen && in_flight == 0 {
                // Every dispatched node finished before the scan started, so
                // the waiting nodes can never become ready.
                warn!(
                    waiting = self.ready.len(),
                    "no node in flight and none ready; dependency cycle?"
                );
                return;
            }
        }
    }
}

/// Run one full pass over `pool` on `workers` and wait for it to drain.
pub(crate) fn run_pass(
    pool: &NodePool,
    workers: &WorkerPool,
    pass: u64,
) -> Result<ExecutionReport> {
    let started = Instant::now();
    let nodes = pool.len();
    debug!(pass, nodes, workers = workers.len(), "pass started");

    workers.tracker().reset();
    pool.reset_pass_state();

    let mut state = Pass::new(pool, workers);
    state.seed();
    state.drive();

    // Completion barrier.
    workers.tracker().wait_idle();
    debug_assert!(workers.is_idle(), "barrier passed with busy workers");

    let report = ExecutionReport {
        pass,
        nodes,
        executed: state.executed,
        skipped: state.skipped,
        elapsed: started.elapsed(),
    };

    let failures: Vec<TaskFailure> = workers
        .tracker()
        .take_failures()
        .into_iter()
        .map(|(index, error)| TaskFailure {
            node: pool.id_of(index),
            label: pool.slot(index).label.clone(),
            error,
        })
        .collect();

    let unreached = nodes - report.executed - report.skipped;
    if unreached > 0 {
        warn!(
            pass,
            unreached,
            failed = failures.len(),
            "pass ended with unreachable nodes"
        );
        return Err(TaskGraphError::Stalled {
            pending: unreached,
            failures,
        });
    }

    if !failures.is_empty() {
        warn!(
            pass,
            failed = failures.len(),
            skipped = report.skipped,
            "pass finished with failed tasks"
        );
        return Err(TaskGraphError::TaskFailed { failures, report });
    }

    debug!(
        pass,
        executed = report.executed,
        elapsed_us = report.elapsed.as_micros() as u64,
        "pass finished"
    );
    Ok(report)
}
