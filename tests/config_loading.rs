mod common;

use std::fs;

use common::{TaskSpecBuilder, WorkloadBuilder, init_tracing, with_timeout};
use taskgraph::config::{GraphConfig, WorkloadFile, load_and_validate, parse_str};
use taskgraph::errors::TaskGraphError;
use taskgraph::graph::NodeState;
use taskgraph::types::WorkMode;
use taskgraph::workload::{build_graph, run_frames};
use tempfile::TempDir;

fn write_workload(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("Workload.toml");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn loads_valid_workload_from_disk() {
    let dir = TempDir::new().unwrap();
    let path = write_workload(
        &dir,
        r#"
[graph]
node_capacity = 16
thread_count = 2
check_cycles = true

[task.generate]
work_us = 100

[task.mesh]
work_us = 200
mode = "sleep"
after = ["generate"]
"#,
    );

    let workload = load_and_validate(&path).unwrap();

    assert_eq!(workload.graph.node_capacity, 16);
    assert_eq!(workload.graph.thread_count, 2);
    assert!(workload.graph.check_cycles);
    assert_eq!(workload.task.len(), 2);

    let mesh = &workload.task["mesh"];
    assert_eq!(mesh.work_us, 200);
    assert_eq!(mesh.mode, WorkMode::Sleep);
    assert_eq!(mesh.after, vec!["generate"]);
    assert_eq!(workload.task["generate"].mode, WorkMode::Spin);
}

#[test]
fn graph_section_defaults_when_missing() {
    let raw = parse_str(
        r#"
[task.only]
work_us = 5
"#,
    )
    .unwrap();
    let workload = WorkloadFile::try_from(raw).unwrap();

    assert_eq!(workload.graph, GraphConfig::default());
    assert_eq!(workload.graph.thread_count, 4);
    assert_eq!(workload.graph.node_capacity, 64);
    assert_eq!(workload.graph.thread_name, "taskgraph-worker");
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let err = load_and_validate(dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, TaskGraphError::IoError(_)));
}

#[test]
fn malformed_toml_is_rejected() {
    let err = parse_str("[task.a\nwork_us = 1").unwrap_err();
    assert!(matches!(err, TaskGraphError::TomlError(_)));
}

#[test]
fn unknown_work_mode_is_rejected() {
    let err = parse_str(
        r#"
[task.a]
mode = "teleport"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, TaskGraphError::TomlError(_)));
}

#[test]
fn empty_workload_is_rejected() {
    let raw = WorkloadBuilder::new().raw();
    let err = WorkloadFile::try_from(raw).unwrap_err();
    assert!(matches!(err, TaskGraphError::ConfigError(_)));
}

#[test]
fn unknown_dependency_is_rejected() {
    let raw = WorkloadBuilder::new()
        .with_task("mesh", TaskSpecBuilder::new().after("generate").build())
        .raw();

    match WorkloadFile::try_from(raw) {
        Err(TaskGraphError::TaskNotFound(msg)) => {
            assert!(msg.contains("mesh"));
            assert!(msg.contains("generate"));
        }
        other => panic!("expected TaskNotFound, got {other:?}"),
    }
}

#[test]
fn self_dependency_is_rejected() {
    let raw = WorkloadBuilder::new()
        .with_task("loop", TaskSpecBuilder::new().after("loop").build())
        .raw();

    match WorkloadFile::try_from(raw) {
        Err(TaskGraphError::ConfigError(msg)) => assert!(msg.contains("itself")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn dependency_cycle_is_rejected() {
    let raw = WorkloadBuilder::new()
        .with_task("a", TaskSpecBuilder::new().after("c").build())
        .with_task("b", TaskSpecBuilder::new().after("a").build())
        .with_task("c", TaskSpecBuilder::new().after("b").build())
        .raw();

    assert!(matches!(
        WorkloadFile::try_from(raw),
        Err(TaskGraphError::DagCycle(_))
    ));
}

#[test]
fn zero_threads_is_rejected() {
    let raw = WorkloadBuilder::new()
        .threads(0)
        .with_task("a", TaskSpecBuilder::new().build())
        .raw();

    match WorkloadFile::try_from(raw) {
        Err(TaskGraphError::ConfigError(msg)) => assert!(msg.contains("thread_count")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn workload_builds_a_graph_with_labels_and_edges() {
    init_tracing();

    let workload = WorkloadBuilder::new()
        .threads(2)
        .node_capacity(2)
        .with_task("generate", TaskSpecBuilder::new().work_us(50).build())
        .with_task(
            "mesh",
            TaskSpecBuilder::new()
                .work_us(50)
                .mode(WorkMode::Sleep)
                .after("generate")
                .build(),
        )
        .with_task("light", TaskSpecBuilder::new().after("generate").build())
        .with_task(
            "upload",
            TaskSpecBuilder::new().after("mesh").after("light").build(),
        )
        .build();

    let (stats, states, upload_parents) = with_timeout(move || {
        let (mut graph, nodes) = build_graph(&workload, workload.graph.clone()).unwrap();

        assert_eq!(graph.len(), 4);
        assert_eq!(graph.thread_count(), 2);
        assert_eq!(
            graph.label(nodes["mesh"]).unwrap().as_deref(),
            Some("mesh")
        );

        let mut upload_parents = graph.parents_of(nodes["upload"]).unwrap();
        upload_parents.sort();
        let mut expected = vec![nodes["mesh"], nodes["light"]];
        expected.sort();
        assert_eq!(upload_parents, expected);

        let stats = run_frames(&mut graph, 3).unwrap();
        let states: Vec<NodeState> = nodes.values().map(|&id| graph.node_state(id)).collect();
        (stats, states, upload_parents.len())
    });

    assert_eq!(stats.frames, 3);
    assert_eq!(stats.nodes_per_frame, 4);
    assert!(stats.fastest <= stats.slowest);
    assert!(stats.mean() >= stats.fastest);
    assert!(states.iter().all(|&s| s == NodeState::Done));
    assert_eq!(upload_parents, 2);
}

#[test]
fn zero_frames_produces_empty_stats() {
    let workload = WorkloadBuilder::new()
        .threads(1)
        .with_task("a", TaskSpecBuilder::new().build())
        .build();

    let (mut graph, _) = build_graph(&workload, workload.graph.clone()).unwrap();
    let stats = run_frames(&mut graph, 0).unwrap();

    assert_eq!(stats.frames, 0);
    assert_eq!(stats.mean(), std::time::Duration::ZERO);
    assert_eq!(stats.fastest, std::time::Duration::ZERO);
}
