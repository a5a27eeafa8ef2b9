use serde::Deserialize;

/// How a workload task burns its `work_us` budget.
///
/// - `Spin`: busy-loop on the worker thread (models CPU-bound jobs such as
///   chunk meshing).
/// - `Sleep`: park the worker thread (models jobs that mostly wait).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkMode {
    Spin,
    Sleep,
}

impl Default for WorkMode {
    fn default() -> Self {
        WorkMode::Spin
    }
}
