// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{RawWorkloadFile, WorkloadFile};
use crate::errors::Result;

/// Load a workload file from `path` without semantic validation.
///
/// Only TOML deserialization happens here; use [`load_and_validate`] to also
/// check dependencies and acyclicity.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawWorkloadFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    parse_str(&contents)
}

/// Parse workload TOML from a string.
pub fn parse_str(contents: &str) -> Result<RawWorkloadFile> {
    let workload: RawWorkloadFile = toml::from_str(contents)?;
    Ok(workload)
}

/// Load a workload file and validate it.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for:
///   - an empty task list,
///   - invalid `[graph]` settings,
///   - unknown or self-referencing `after` entries,
///   - dependency cycles.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<WorkloadFile> {
    let raw = load_from_path(&path)?;
    WorkloadFile::try_from(raw)
}

/// Workload file used when `--workload` is not given.
pub fn default_workload_path() -> PathBuf {
    PathBuf::from("Workload.toml")
}
