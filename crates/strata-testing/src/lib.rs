//! # Strata Testing
//!
//! Test utilities for code that schedules batches with Strata.
//!
//! - **Mock Executor**: a scriptable [`ToolExecutor`](strata_core::ToolExecutor)
//!   with per-target and per-invocation responses, failures, panics and
//!   delays, plus a call log for asserting on resolved arguments, start and
//!   finish order, and peak concurrency
//!
//! ## Usage
//!
//! ```rust
//! use strata_core::{CancellationToken, ExecutionRequest, InvocationId, Target, ToolExecutor};
//! use strata_testing::MockExecutor;
//! use serde_json::json;
//! use std::collections::BTreeMap;
//!
//! # tokio_test::block_on(async {
//! let mock = MockExecutor::new().with_response("weather", json!({"temp": 21}));
//! let request = ExecutionRequest {
//!     invocation_id: InvocationId::parse("w").unwrap(),
//!     target: Target::parse("weather").unwrap(),
//!     arguments: BTreeMap::new(),
//! };
//!
//! let value = mock.execute(request, CancellationToken::new()).await.unwrap();
//! assert_eq!(value, json!({"temp": 21}));
//! assert!(mock.was_called("w"));
//! # });
//! ```

/// Scriptable executor with call tracking
pub mod mock_executor;

pub use mock_executor::{CallEvent, MockBehavior, MockExecutor};
