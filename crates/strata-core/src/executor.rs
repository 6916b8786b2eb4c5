//! The seam between the scheduler and whatever actually runs an invocation.
//!
//! The scheduler never knows what a target does. It hands each ready
//! invocation, with references already substituted, to a caller-supplied
//! [`ToolExecutor`] together with a cancellation token, and records whatever
//! comes back.

use crate::identifiers::{InvocationId, Target};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// A fully resolved invocation handed to the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Which invocation is running
    pub invocation_id: InvocationId,
    /// The operation to perform
    pub target: Target,
    /// Arguments with every reference replaced by a concrete value
    pub arguments: BTreeMap<String, Value>,
}

impl ExecutionRequest {
    /// Look up a resolved argument by name.
    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name)
    }

    /// Look up a resolved string argument by name.
    pub fn str_argument(&self, name: &str) -> Option<&str> {
        self.arguments.get(name).and_then(Value::as_str)
    }
}

/// Error returned by an executor for a single invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ToolFailure {
    /// Description of what went wrong
    pub message: String,
}

impl ToolFailure {
    /// Create a failure with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Build a failure from any displayable error.
    pub fn from_error(err: impl std::fmt::Display) -> Self {
        Self::new(err.to_string())
    }
}

impl From<String> for ToolFailure {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ToolFailure {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Runs a single invocation.
///
/// Implementations may perform I/O, call external services or run local
/// logic. They should watch `cancel` and return promptly once it fires; the
/// scheduler stops waiting after a grace period either way.
///
/// # Example
///
/// ```rust
/// use strata_core::{ExecutionRequest, ToolExecutor, ToolFailure};
/// use async_trait::async_trait;
/// use serde_json::{json, Value};
/// use tokio_util::sync::CancellationToken;
///
/// struct Echo;
///
/// #[async_trait]
/// impl ToolExecutor for Echo {
///     async fn execute(
///         &self,
///         request: ExecutionRequest,
///         _cancel: CancellationToken,
///     ) -> Result<Value, ToolFailure> {
///         Ok(json!(request.arguments))
///     }
/// }
/// ```
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute one invocation.
    async fn execute(
        &self,
        request: ExecutionRequest,
        cancel: CancellationToken,
    ) -> Result<Value, ToolFailure>;
}

#[async_trait]
impl<T: ToolExecutor + ?Sized> ToolExecutor for Arc<T> {
    async fn execute(
        &self,
        request: ExecutionRequest,
        cancel: CancellationToken,
    ) -> Result<Value, ToolFailure> {
        (**self).execute(request, cancel).await
    }
}

/// Adapter turning an async closure into a [`ToolExecutor`].
pub struct FnExecutor<F> {
    func: F,
}

/// Wrap an async closure as a [`ToolExecutor`].
///
/// ```rust
/// use strata_core::{executor_fn, ToolFailure};
/// use serde_json::json;
///
/// let executor = executor_fn(|request, _cancel| async move {
///     match request.target.as_str() {
///         "ping" => Ok(json!("pong")),
///         other => Err(ToolFailure::new(format!("unknown target {other}"))),
///     }
/// });
/// # let _ = executor;
/// ```
pub fn executor_fn<F, Fut>(func: F) -> FnExecutor<F>
where
    F: Fn(ExecutionRequest, CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ToolFailure>> + Send,
{
    FnExecutor { func }
}

#[async_trait]
impl<F, Fut> ToolExecutor for FnExecutor<F>
where
    F: Fn(ExecutionRequest, CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ToolFailure>> + Send,
{
    async fn execute(
        &self,
        request: ExecutionRequest,
        cancel: CancellationToken,
    ) -> Result<Value, ToolFailure> {
        (self.func)(request, cancel).await
    }
}
