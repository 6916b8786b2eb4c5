//! Workspace-level helpers shared by the integration tests and benchmarks.

pub mod fixtures;
