//! Batch-fatal structural errors.
//!
//! These are detected while building and leveling the dependency graph,
//! before any executor call is made. They are the only errors that abort a
//! whole batch; everything else is recorded as an
//! [`Outcome`](crate::outcome::Outcome).

use crate::identifiers::InvocationId;
use serde::Serialize;
use thiserror::Error;

/// A batch whose dependency structure cannot be scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum StructuralError {
    /// The dependency graph contains a cycle.
    ///
    /// `remaining` lists every invocation that could not be leveled, in
    /// submission order. It includes cycle members and anything downstream
    /// of them.
    #[error("Dependency cycle among invocations: {}", join_ids(.remaining))]
    DependencyCycle { remaining: Vec<InvocationId> },

    /// An invocation names a dependency that is not part of the batch.
    #[error("Invocation '{invocation}' depends on unknown invocation '{missing}'")]
    UnknownDependency {
        invocation: InvocationId,
        missing: InvocationId,
    },

    /// An invocation depends on itself.
    #[error("Invocation '{invocation}' depends on itself")]
    SelfDependency { invocation: InvocationId },

    /// Two invocations share an id.
    #[error("Invocation id '{invocation}' appears more than once in the batch")]
    DuplicateInvocation { invocation: InvocationId },
}

fn join_ids(ids: &[InvocationId]) -> String {
    ids.iter()
        .map(InvocationId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl StructuralError {
    /// Machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            StructuralError::DependencyCycle { .. } => "dependency_cycle",
            StructuralError::UnknownDependency { .. } => "unknown_dependency",
            StructuralError::SelfDependency { .. } => "self_dependency",
            StructuralError::DuplicateInvocation { .. } => "duplicate_invocation",
        }
    }

    /// The offending invocation ids.
    ///
    /// For `UnknownDependency` this is the missing id, matching what callers
    /// need to correct.
    pub fn invocations(&self) -> Vec<&InvocationId> {
        match self {
            StructuralError::DependencyCycle { remaining } => remaining.iter().collect(),
            StructuralError::UnknownDependency { missing, .. } => vec![missing],
            StructuralError::SelfDependency { invocation }
            | StructuralError::DuplicateInvocation { invocation } => vec![invocation],
        }
    }
}

/// Result type for graph construction and leveling.
pub type StructuralResult<T> = Result<T, StructuralError>;
