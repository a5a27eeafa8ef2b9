// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{GraphConfig, MAX_THREAD_COUNT, RawWorkloadFile, WorkloadFile};
use crate::errors::{Result, TaskGraphError};

impl TryFrom<RawWorkloadFile> for WorkloadFile {
    type Error = crate::errors::TaskGraphError;

    fn try_from(raw: RawWorkloadFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_workload(&raw)?;
        Ok(WorkloadFile::new_unchecked(raw.graph, raw.task))
    }
}

impl GraphConfig {
    /// Check the settings a [`TaskGraph`](crate::graph::TaskGraph) relies on.
    pub fn validate(&self) -> Result<()> {
        if self.thread_count == 0 {
            return Err(TaskGraphError::ConfigError(
                "[graph].thread_count must be >= 1 (got 0)".to_string(),
            ));
        }
        if self.thread_count > MAX_THREAD_COUNT {
            return Err(TaskGraphError::ConfigError(format!(
                "[graph].thread_count must be <= {MAX_THREAD_COUNT} (got {})",
                self.thread_count
            )));
        }
        if self.thread_name.trim().is_empty() {
            return Err(TaskGraphError::ConfigError(
                "[graph].thread_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_raw_workload(cfg: &RawWorkloadFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    cfg.graph.validate()?;
    validate_task_dependencies(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawWorkloadFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(TaskGraphError::ConfigError(
            "workload must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_dependencies(cfg: &RawWorkloadFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            if dep == name {
                return Err(TaskGraphError::ConfigError(format!(
                    "task '{}' cannot depend on itself in `after`",
                    name
                )));
            }
            if !cfg.task.contains_key(dep) {
                return Err(TaskGraphError::TaskNotFound(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawWorkloadFile) -> Result<()> {
    // Edge direction: dep -> task, so `after = ["A"]` on B adds A -> B.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(TaskGraphError::DagCycle(format!(
            "cycle detected in workload involving task '{}'",
            cycle.node_id()
        ))),
    }
}
