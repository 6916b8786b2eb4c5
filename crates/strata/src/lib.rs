//! # Strata
//!
//! Strata schedules a batch of tool invocations that may consume each
//! other's outputs. It finds the maximum safe parallelism, runs the batch in
//! dependency order, isolates per-invocation failures, and returns results
//! in submission order.
//!
//! ## Core Components
//!
//! - **[InvocationSpec]**: One requested unit of work, with arguments that may
//!   reference other invocations' outputs
//! - **[ToolExecutor]**: The caller-supplied code that actually runs an invocation
//! - **[Scheduler]**: Validates, levels and executes a batch
//! - **[ExecuteOptions]**: Timeouts and per-level concurrency
//!
//! ## Quick Start
//!
//! ```rust
//! use strata::{InvocationSpec, Scheduler, ToolFailure, executor_fn};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let batch = vec![
//!     InvocationSpec::builder().id("weather").target("get_weather").build().unwrap(),
//!     InvocationSpec::builder().id("news").target("get_news").build().unwrap(),
//!     InvocationSpec::builder()
//!         .id("brief")
//!         .target("summarize")
//!         .reference("weather", "weather")
//!         .reference("news", "news")
//!         .build()
//!         .unwrap(),
//! ];
//!
//! let executor = executor_fn(|request, _cancel| async move {
//!     match request.target.as_str() {
//!         "get_weather" => Ok(json!("sunny")),
//!         "get_news" => Ok(json!("quiet day")),
//!         "summarize" => Ok(json!(request.arguments)),
//!         other => Err(ToolFailure::new(format!("unknown target {other}"))),
//!     }
//! });
//!
//! let scheduler = Scheduler::default();
//! assert_eq!(scheduler.plan(&batch).unwrap().levels.len(), 2);
//!
//! let results = scheduler.execute(&batch, executor).await.unwrap();
//! assert!(results.iter().all(|r| r.is_success()));
//! # });
//! ```

// ============================================================================
// Module aliases for namespaced access
// ============================================================================

pub use strata_core as core;
pub use strata_scheduler as scheduler;

#[cfg(feature = "testing")]
pub use strata_testing as testing;

// ============================================================================
// Core types
// ============================================================================

pub use strata_core::{
    ArgValue, BATCH_CANCELLED, CancellationToken, ExecutionRequest, FailureKind, InvocationId,
    InvocationResult, InvocationSpec, InvocationSpecBuilder, InvocationStatus, OutputPath, Outcome,
    Reference, SpecBuildError, StructuralError, StructuralResult, Target, TemplatePart,
    ToolExecutor, ToolFailure, executor_fn,
};

// ============================================================================
// Scheduling
// ============================================================================

pub use strata_scheduler::{
    BatchReport, BatchSummary, ConcurrencyLimit, ConfigError, ExecuteOptions, ExecutionPlan,
    Scheduler, execute,
};
