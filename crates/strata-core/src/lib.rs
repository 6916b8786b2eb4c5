//! # Strata Core
//!
//! Core types for the Strata scheduler: validated identifiers, the
//! invocation model with its reference-carrying arguments, per-invocation
//! outcomes, batch-fatal structural errors, and the [`ToolExecutor`] trait
//! through which callers plug in the code that actually runs an invocation.

pub mod argument;
pub mod error;
pub mod executor;
pub mod identifiers;
pub mod invocation;
pub mod outcome;

pub use argument::{ArgValue, InvalidOutputPath, OutputPath, Reference, TemplatePart};
pub use error::{StructuralError, StructuralResult};
pub use executor::{ExecutionRequest, FnExecutor, ToolExecutor, ToolFailure, executor_fn};
pub use identifiers::{IdValidationError, InvocationId, Target};
pub use invocation::{InvocationSpec, InvocationSpecBuilder, InvocationStatus, SpecBuildError};
pub use outcome::{BATCH_CANCELLED, FailureKind, InvocationResult, Outcome};

// Cancellation handle passed to every executor call.
pub use tokio_util::sync::CancellationToken;
