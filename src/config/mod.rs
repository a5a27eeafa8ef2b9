// src/config/mod.rs

//! Graph settings and workload files.
//!
//! - [`model`] defines [`GraphConfig`] and the workload TOML layout.
//! - [`loader`] reads workload files from disk.
//! - [`validate`] turns a [`RawWorkloadFile`] into a [`WorkloadFile`] and
//!   checks [`GraphConfig`] values.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_workload_path, load_and_validate, load_from_path, parse_str};
pub use model::{
    DEFAULT_THREAD_COUNT, GraphConfig, MAX_THREAD_COUNT, RawWorkloadFile, TaskSpec, WorkloadFile,
};
