// src/lib.rs

//! Dependency-ordered parallel task graph.
//!
//! Build a [`TaskGraph`](graph::TaskGraph) of [`Task`](task::Task)s, wire
//! parent/child edges, and call `execute()` once per frame: every node runs
//! exactly once per pass, never before its parents, spread over a fixed pool
//! of worker threads.
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use taskgraph::graph::TaskGraph;
//! use taskgraph::task::Task;
//!
//! let log = Arc::new(Mutex::new(Vec::new()));
//! let record = Task::from_fn(|log: Arc<Mutex<Vec<&'static str>>>, name: &'static str| {
//!     log.lock().unwrap().push(name);
//! });
//!
//! let mut graph = TaskGraph::new(8).unwrap();
//! let generate = graph.add_task(record.clone(), (log.clone(), "generate")).unwrap();
//! let mesh = graph.add_task_after(record.clone(), (log.clone(), "mesh"), generate).unwrap();
//! graph.add_task_after(record, (log.clone(), "upload"), mesh).unwrap();
//!
//! graph.execute().unwrap();
//! assert_eq!(*log.lock().unwrap(), ["generate", "mesh", "upload"]);
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod graph;
pub mod logging;
pub mod task;
pub mod types;
pub mod workload;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::WorkloadFile;
use crate::workload::{FrameStats, build_graph, run_frames};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - workload loading and validation
/// - graph construction
/// - frame execution and reporting
pub fn run(args: CliArgs) -> Result<()> {
    let workload = load_and_validate(&args.workload)?;

    let mut graph_config = workload.graph.clone();
    if let Some(threads) = args.threads {
        graph_config.thread_count = threads;
        graph_config.validate()?;
    }

    if args.dry_run {
        print_dry_run(&workload, args.threads);
        return Ok(());
    }

    let (mut graph, nodes) = build_graph(&workload, graph_config)?;
    info!(
        tasks = nodes.len(),
        threads = graph.thread_count(),
        frames = args.frames,
        "running workload"
    );

    let stats = run_frames(&mut graph, args.frames)?;
    graph.stop();

    print_stats(&stats);
    Ok(())
}

/// Simple dry-run output: print graph settings and tasks with their deps.
fn print_dry_run(workload: &WorkloadFile, threads: Option<usize>) {
    println!("taskgraph dry-run");
    println!("  graph.node_capacity = {}", workload.graph.node_capacity);
    println!(
        "  graph.thread_count = {}",
        threads.unwrap_or(workload.graph.thread_count)
    );
    println!("  graph.check_cycles = {}", workload.graph.check_cycles);
    println!();

    println!("tasks ({}):", workload.task.len());
    for (name, task) in workload.task.iter() {
        println!("  - {name}");
        println!("      work: {}us ({:?})", task.work_us, task.mode);
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
    }

    debug!("dry-run complete (no execution)");
}

fn print_stats(stats: &FrameStats) {
    println!("frames:   {}", stats.frames);
    println!("nodes:    {}", stats.nodes_per_frame);
    println!("mean:     {:?}", stats.mean());
    println!("fastest:  {:?}", stats.fastest);
    println!("slowest:  {:?}", stats.slowest);
}
