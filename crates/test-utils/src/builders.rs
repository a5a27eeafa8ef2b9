#![allow(dead_code)]

use std::collections::BTreeMap;

use taskgraph::config::{GraphConfig, RawWorkloadFile, TaskSpec, WorkloadFile};
use taskgraph::types::WorkMode;

/// Builder for `WorkloadFile` to simplify test setup.
pub struct WorkloadBuilder {
    workload: RawWorkloadFile,
}

impl WorkloadBuilder {
    pub fn new() -> Self {
        Self {
            workload: RawWorkloadFile {
                graph: GraphConfig::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskSpec) -> Self {
        self.workload.task.insert(name.to_string(), task);
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.workload.graph.thread_count = threads;
        self
    }

    pub fn node_capacity(mut self, capacity: usize) -> Self {
        self.workload.graph.node_capacity = capacity;
        self
    }

    pub fn check_cycles(mut self, val: bool) -> Self {
        self.workload.graph.check_cycles = val;
        self
    }

    /// The raw, unvalidated workload.
    pub fn raw(self) -> RawWorkloadFile {
        self.workload
    }

    pub fn build(self) -> WorkloadFile {
        WorkloadFile::try_from(self.workload).expect("Failed to build valid workload from builder")
    }
}

impl Default for WorkloadBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskSpec`.
pub struct TaskSpecBuilder {
    task: TaskSpec,
}

impl TaskSpecBuilder {
    pub fn new() -> Self {
        Self {
            task: TaskSpec {
                work_us: 0,
                mode: WorkMode::Spin,
                after: vec![],
            },
        }
    }

    pub fn work_us(mut self, work_us: u64) -> Self {
        self.task.work_us = work_us;
        self
    }

    pub fn mode(mut self, mode: WorkMode) -> Self {
        self.task.mode = mode;
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn build(self) -> TaskSpec {
        self.task
    }
}

impl Default for TaskSpecBuilder {
    fn default() -> Self {
        Self::new()
    }
}
