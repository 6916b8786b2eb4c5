//! # Strata Scheduler
//!
//! Dependency-aware, level-barrier concurrent execution of invocation
//! batches.
//!
//! A batch runs in five stages:
//!
//! - [`graph`] builds the dependency graph and validates referential integrity
//! - [`level`] detects cycles and groups invocations into levels
//! - [`propagate`] substitutes completed outputs into the next level and skips
//!   invocations whose dependencies did not succeed
//! - [`executor`] runs one level concurrently behind a barrier
//! - [`scheduler`] drives the stages and returns results in submission order
//!
//! Structural problems (cycles, unknown or self dependencies, duplicate ids)
//! are reported before any executor call. Everything that goes wrong while
//! running is recorded as a per-invocation [`Outcome`](strata_core::Outcome).

pub mod config;
mod duration;
pub mod executor;
pub mod graph;
pub mod level;
pub mod propagate;
pub mod scheduler;

pub use config::{ConcurrencyLimit, ConfigError, DEFAULT_CANCELLATION_GRACE, ExecuteOptions};
pub use executor::{LevelExecutor, LevelRun};
pub use graph::DependencyGraph;
pub use level::{ExecutionPlan, Levels, level};
pub use propagate::{Prepared, ReadyInvocation, prepare};
pub use scheduler::{BatchReport, BatchSummary, Scheduler, execute};
