#![allow(dead_code)]

pub use taskgraph_test_utils::builders::{TaskSpecBuilder, WorkloadBuilder};
pub use taskgraph_test_utils::recorder::ExecutionLog;
pub use taskgraph_test_utils::{init_tracing, with_timeout};

use taskgraph::task::Task;

/// A task that records `name` in `log` each time it runs.
pub fn recording_task() -> Task<(ExecutionLog, &'static str)> {
    Task::from_fn(|log: ExecutionLog, name: &'static str| log.record(name))
}
