// src/workload.rs

//! Synthetic frame workloads.
//!
//! A workload file describes named tasks, how long each one works and
//! which tasks it runs after. [`build_graph`] turns it into a
//! [`TaskGraph`] once; [`run_frames`] then executes that graph repeatedly,
//! the way an engine would once per frame, and collects timing statistics.

use std::collections::BTreeMap;
use std::hint;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::{GraphConfig, WorkloadFile};
use crate::errors::Result;
use crate::graph::{NodeId, TaskGraph};
use crate::task::Task;
use crate::types::WorkMode;

/// Timing summary over a number of executed frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameStats {
    pub frames: usize,
    pub nodes_per_frame: usize,
    pub total: Duration,
    pub fastest: Duration,
    pub slowest: Duration,
}

impl FrameStats {
    pub fn mean(&self) -> Duration {
        if self.frames == 0 {
            return Duration::ZERO;
        }
        self.total / self.frames as u32
    }
}

/// Simulate `work_us` microseconds of work in the given mode.
pub fn simulate_work(mode: WorkMode, work_us: u64) {
    let budget = Duration::from_micros(work_us);
    match mode {
        WorkMode::Sleep => thread::sleep(budget),
        WorkMode::Spin => {
            let started = Instant::now();
            while started.elapsed() < budget {
                hint::spin_loop();
            }
        }
    }
}

/// Build a task graph for `workload`, using `graph` for the pool settings.
///
/// Returns the graph and the node handle of every task, keyed by name.
pub fn build_graph(
    workload: &WorkloadFile,
    graph: GraphConfig,
) -> Result<(TaskGraph, BTreeMap<String, NodeId>)> {
    let mut task_graph = TaskGraph::from_config(graph)?;
    let work = Task::from_fn(simulate_work);

    // First pass: one node per task, with its work budget frozen in.
    let mut nodes = BTreeMap::new();
    for (name, task) in workload.task.iter() {
        let node = task_graph.add_task(work.clone(), (task.mode, task.work_us))?;
        task_graph.set_label(node, name.clone())?;
        nodes.insert(name.clone(), node);
    }

    // Second pass: wire `after` lists. Validation guarantees every name
    // resolves.
    for (name, task) in workload.task.iter() {
        let parents: Vec<NodeId> = task
            .after
            .iter()
            .filter_map(|dep| nodes.get(dep).copied())
            .collect();
        if let Some(&node) = nodes.get(name) {
            task_graph.add_parents(node, &parents)?;
        }
    }

    debug!(tasks = nodes.len(), "workload graph built");
    Ok((task_graph, nodes))
}

/// Execute `graph` `frames` times and summarise the frame times.
pub fn run_frames(graph: &mut TaskGraph, frames: usize) -> Result<FrameStats> {
    let mut stats = FrameStats {
        frames: 0,
        nodes_per_frame: graph.len(),
        total: Duration::ZERO,
        fastest: Duration::MAX,
        slowest: Duration::ZERO,
    };

    for frame in 0..frames {
        let report = graph.execute()?;
        debug!(frame, elapsed_us = report.elapsed.as_micros() as u64, "frame done");

        stats.frames += 1;
        stats.total += report.elapsed;
        stats.fastest = stats.fastest.min(report.elapsed);
        stats.slowest = stats.slowest.max(report.elapsed);
    }

    if stats.frames == 0 {
        stats.fastest = Duration::ZERO;
    }

    info!(
        frames = stats.frames,
        nodes = stats.nodes_per_frame,
        mean_us = stats.mean().as_micros() as u64,
        "workload finished"
    );
    Ok(stats)
}
