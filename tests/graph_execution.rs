mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use common::{ExecutionLog, init_tracing, recording_task, with_timeout};
use taskgraph::config::GraphConfig;
use taskgraph::graph::{GraphState, NodeState, TaskGraph};
use taskgraph::task::Task;

#[test]
fn parent_runs_before_children_and_join_waits_for_both() {
    init_tracing();

    let log = with_timeout(|| {
        let log = ExecutionLog::new();
        let task = recording_task();
        let mut graph = TaskGraph::with_threads(8, 4).unwrap();

        let a = graph.add_task(task.clone(), (log.clone(), "A")).unwrap();
        let b = graph.add_task_after(task.clone(), (log.clone(), "B"), a).unwrap();
        let c = graph.add_task_after(task.clone(), (log.clone(), "C"), a).unwrap();
        graph
            .add_task_with(task, (log.clone(), "D"), &[b, c], &[])
            .unwrap();

        let report = graph.execute().unwrap();
        assert_eq!(report.nodes, 4);
        assert_eq!(report.executed, 4);
        assert_eq!(report.skipped, 0);
        assert!(graph.is_done());
        log
    });

    assert_eq!(log.count(), 4);
    log.assert_before("A", "B");
    log.assert_before("A", "C");
    log.assert_before("B", "D");
    log.assert_before("C", "D");
}

#[test]
fn independent_roots_run_in_parallel() {
    init_tracing();

    let peak = with_timeout(|| {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let task: Task<(Arc<AtomicUsize>, Arc<AtomicUsize>)> =
            Task::from_fn(|active: Arc<AtomicUsize>, peak: Arc<AtomicUsize>| {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(50));
                active.fetch_sub(1, Ordering::SeqCst);
            });

        let mut graph = TaskGraph::with_threads(8, 4).unwrap();
        for _ in 0..4 {
            graph
                .add_task(task.clone(), (active.clone(), peak.clone()))
                .unwrap();
        }
        graph.execute().unwrap();
        peak.load(Ordering::SeqCst)
    });

    assert!(peak >= 2, "expected overlapping roots, peak concurrency was {peak}");
}

#[test]
fn fan_out_children_wait_for_the_root() {
    init_tracing();

    let log = with_timeout(|| {
        let log = ExecutionLog::new();
        let task = recording_task();
        let mut graph = TaskGraph::with_threads(32, 4).unwrap();

        let root = graph.add_task(task.clone(), (log.clone(), "root")).unwrap();
        for _ in 0..16 {
            graph
                .add_task_after(task.clone(), (log.clone(), "leaf"), root)
                .unwrap();
        }

        graph.execute().unwrap();
        log
    });

    assert_eq!(log.runs_of("root"), 1);
    assert_eq!(log.runs_of("leaf"), 16);
    log.assert_before("root", "leaf");
}

#[test]
fn diamond_is_ordered_on_every_repetition() {
    init_tracing();

    with_timeout(|| {
        let log = ExecutionLog::new();
        let task = recording_task();
        let mut graph = TaskGraph::with_threads(8, 4).unwrap();

        let top = graph.add_task(task.clone(), (log.clone(), "top")).unwrap();
        let left = graph.add_task_after(task.clone(), (log.clone(), "left"), top).unwrap();
        let right = graph.add_task_after(task.clone(), (log.clone(), "right"), top).unwrap();
        graph
            .add_task_with(task, (log.clone(), "bottom"), &[left, right], &[])
            .unwrap();

        for pass in 1..=200u64 {
            log.clear();
            let report = graph.execute().unwrap();
            assert_eq!(report.pass, pass);
            assert_eq!(log.count(), 4);
            log.assert_before("top", "left");
            log.assert_before("top", "right");
            log.assert_before("left", "bottom");
            log.assert_before("right", "bottom");
        }
    });
}

#[test]
fn arguments_are_frozen_at_add_time() {
    init_tracing();

    let (seen, chunk) = with_timeout(|| {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let task: Task<(Arc<Mutex<Vec<String>>>, String)> =
            Task::from_fn(|seen: Arc<Mutex<Vec<String>>>, value: String| {
                seen.lock().unwrap().push(value);
            });

        let mut chunk = String::from("chunk-0");
        let mut graph = TaskGraph::with_threads(4, 2).unwrap();
        graph.add_task(task, (seen.clone(), chunk.clone())).unwrap();
        chunk.push_str("-edited");

        graph.execute().unwrap();
        graph.execute().unwrap();
        (seen, chunk)
    });

    assert_eq!(chunk, "chunk-0-edited");
    assert_eq!(*seen.lock().unwrap(), vec!["chunk-0", "chunk-0"]);
}

#[test]
fn executing_an_empty_graph_returns_immediately() {
    init_tracing();

    let report = with_timeout(|| {
        let mut graph = TaskGraph::new(4).unwrap();
        graph.execute().unwrap()
    });

    assert_eq!(report.nodes, 0);
    assert_eq!(report.executed, 0);
}

#[test]
fn graph_can_be_rebuilt_after_clear() {
    init_tracing();

    let log = with_timeout(|| {
        let log = ExecutionLog::new();
        let task = recording_task();
        let mut graph = TaskGraph::with_threads(4, 2).unwrap();

        let a = graph.add_task(task.clone(), (log.clone(), "a")).unwrap();
        let b = graph.add_task_after(task.clone(), (log.clone(), "b"), a).unwrap();
        let c = graph.add_task_after(task.clone(), (log.clone(), "c"), b).unwrap();
        graph.execute().unwrap();
        assert_eq!(log.names(), vec!["a", "b", "c"]);

        graph.clear().unwrap();
        log.clear();
        assert!(graph.is_empty());
        assert_eq!(graph.node_state(a), NodeState::Free);

        // Freed slots are handed out again, lowest index first.
        let x = graph.add_task(task.clone(), (log.clone(), "x")).unwrap();
        let y = graph.add_task(task.clone(), (log.clone(), "y")).unwrap();
        let z = graph.add_task(task, (log.clone(), "z")).unwrap();
        assert_eq!(
            [x.index(), y.index(), z.index()],
            [a.index(), b.index(), c.index()]
        );
        assert_ne!(x, a);

        // Nothing of the old chain survives in the reused slots.
        for id in [x, y, z] {
            assert!(graph.parents_of(id).unwrap().is_empty());
            assert!(graph.children_of(id).unwrap().is_empty());
        }

        // Wire the reused slots in reverse: z -> y -> x.
        graph.add_parents(y, &[z]).unwrap();
        graph.add_children(y, &[x]).unwrap();
        assert_eq!(graph.parents_of(x).unwrap(), vec![y]);
        assert_eq!(graph.children_of(z).unwrap(), vec![y]);
        assert_eq!(graph.len(), 3);

        graph.execute().unwrap();
        log
    });

    assert_eq!(log.names(), vec!["z", "y", "x"]);
}

#[test]
fn nodes_rerun_on_every_execute_without_clear() {
    init_tracing();

    let calls = with_timeout(|| {
        let calls = Arc::new(AtomicUsize::new(0));
        let task: Task<(Arc<AtomicUsize>,)> = Task::from_fn(|calls: Arc<AtomicUsize>| {
            calls.fetch_add(1, Ordering::SeqCst);
        });

        let mut graph = TaskGraph::with_threads(8, 3).unwrap();
        let root = graph.add_task(task.clone(), (calls.clone(),)).unwrap();
        for _ in 0..4 {
            graph.add_task_after(task.clone(), (calls.clone(),), root).unwrap();
        }

        for _ in 0..5 {
            graph.execute().unwrap();
        }
        calls.load(Ordering::SeqCst)
    });

    assert_eq!(calls, 25);
}

#[test]
fn add_task_with_wires_existing_children() {
    init_tracing();

    let log = with_timeout(|| {
        let log = ExecutionLog::new();
        let task = recording_task();
        let mut graph = TaskGraph::with_threads(8, 2).unwrap();

        let source = graph.add_task(task.clone(), (log.clone(), "source")).unwrap();
        let sink = graph.add_task(task.clone(), (log.clone(), "sink")).unwrap();
        let middle = graph
            .add_task_with(task, (log.clone(), "middle"), &[source], &[sink])
            .unwrap();

        assert_eq!(graph.parents_of(middle).unwrap(), vec![source]);
        assert_eq!(graph.children_of(middle).unwrap(), vec![sink]);
        assert_eq!(graph.parents_of(sink).unwrap(), vec![middle]);

        graph.execute().unwrap();
        log
    });

    assert_eq!(log.names(), vec!["source", "middle", "sink"]);
}

#[test]
fn add_parents_and_children_after_creation() {
    init_tracing();

    let log = with_timeout(|| {
        let log = ExecutionLog::new();
        let task = recording_task();
        let mut graph = TaskGraph::with_threads(8, 4).unwrap();

        let a = graph.add_task(task.clone(), (log.clone(), "a")).unwrap();
        let b = graph.add_task(task.clone(), (log.clone(), "b")).unwrap();
        let c = graph.add_task(task, (log.clone(), "c")).unwrap();

        graph.add_children(a, &[b]).unwrap();
        graph.add_parents(c, &[b]).unwrap();
        // Repeating an edge does not add a second dependency.
        graph.add_parents(b, &[a]).unwrap();
        assert_eq!(graph.parents_of(b).unwrap(), vec![a]);

        graph.execute().unwrap();
        log
    });

    assert_eq!(log.names(), vec!["a", "b", "c"]);
}

#[test]
fn pool_grows_beyond_initial_capacity() {
    init_tracing();

    let (calls, capacity) = with_timeout(|| {
        let calls = Arc::new(AtomicUsize::new(0));
        let task: Task<(Arc<AtomicUsize>,)> = Task::from_fn(|calls: Arc<AtomicUsize>| {
            calls.fetch_add(1, Ordering::SeqCst);
        });

        let mut graph = TaskGraph::with_threads(2, 2).unwrap();
        let mut previous = graph.add_task(task.clone(), (calls.clone(),)).unwrap();
        for _ in 0..9 {
            previous = graph
                .add_task_after(task.clone(), (calls.clone(),), previous)
                .unwrap();
        }

        graph.execute().unwrap();
        (calls.load(Ordering::SeqCst), graph.capacity())
    });

    assert_eq!(calls, 10);
    assert!(capacity >= 10);
}

#[test]
fn capacity_is_kept_after_clear() {
    let mut graph = TaskGraph::with_threads(1, 1).unwrap();
    let task: Task = Task::from_fn(|| {});
    for _ in 0..5 {
        graph.add_task(task.clone(), ()).unwrap();
    }
    let grown = graph.capacity();

    graph.clear().unwrap();

    assert_eq!(graph.capacity(), grown);
    assert_eq!(graph.len(), 0);
}

#[test]
fn single_worker_still_respects_order() {
    init_tracing();

    let log = with_timeout(|| {
        let log = ExecutionLog::new();
        let task = recording_task();
        let mut graph = TaskGraph::with_threads(8, 1).unwrap();

        let a = graph.add_task(task.clone(), (log.clone(), "a")).unwrap();
        let b = graph.add_task_after(task.clone(), (log.clone(), "b"), a).unwrap();
        graph.add_task_after(task, (log.clone(), "c"), b).unwrap();

        graph.execute().unwrap();
        log
    });

    assert_eq!(log.names(), vec!["a", "b", "c"]);
}

#[test]
fn labels_and_node_states_after_a_pass() {
    init_tracing();

    let mut graph = TaskGraph::with_threads(4, 2).unwrap();
    let task: Task = Task::from_fn(|| {});
    let node = graph.add_task(task, ()).unwrap();
    assert_eq!(graph.node_state(node), NodeState::Bound);

    graph.set_label(node, "physics").unwrap();
    assert_eq!(graph.label(node).unwrap().as_deref(), Some("physics"));

    graph.execute().unwrap();
    assert_eq!(graph.node_state(node), NodeState::Done);
    assert_eq!(graph.state(), GraphState::Idle);
}

#[test]
fn from_config_uses_thread_count_and_name() {
    let graph = TaskGraph::from_config(GraphConfig {
        node_capacity: 16,
        thread_count: 3,
        check_cycles: true,
        thread_name: "frame-job".to_string(),
    })
    .unwrap();

    assert_eq!(graph.thread_count(), 3);
    assert_eq!(graph.capacity(), 16);
    assert!(graph.config().check_cycles);
}

#[test]
fn worker_threads_carry_the_configured_name() {
    init_tracing();

    let names = with_timeout(|| {
        let names = Arc::new(Mutex::new(Vec::new()));
        let task: Task<(Arc<Mutex<Vec<String>>>,)> =
            Task::from_fn(|names: Arc<Mutex<Vec<String>>>| {
                let name = thread::current().name().unwrap_or_default().to_string();
                names.lock().unwrap().push(name);
            });

        let mut graph = TaskGraph::from_config(GraphConfig {
            thread_count: 2,
            thread_name: "frame-job".to_string(),
            ..GraphConfig::default()
        })
        .unwrap();
        graph.add_task(task, (names.clone(),)).unwrap();
        graph.execute().unwrap();
        names
    });

    let names = names.lock().unwrap();
    assert_eq!(names.len(), 1);
    assert!(names[0].starts_with("frame-job-"), "got {:?}", names[0]);
}
