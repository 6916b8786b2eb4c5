//! Invocation requests and their lifecycle.

use crate::argument::{ArgValue, InvalidOutputPath, OutputPath};
use crate::identifiers::{IdValidationError, InvocationId, Target};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// A request to run one operation as part of a batch.
///
/// Dependencies come from two places: ids listed in `depends_on`, and every
/// [`Reference`](crate::argument::Reference) found in `arguments`. The
/// scheduler unions both.
///
/// # Example
///
/// ```rust
/// use strata_core::InvocationSpec;
///
/// let spec = InvocationSpec::builder()
///     .id("summarize")
///     .target("llm_complete")
///     .literal("style", "bullet points")
///     .reference("text", "fetch_page")
///     .depends_on("auth")
///     .build()
///     .expect("valid invocation");
///
/// let deps: Vec<_> = spec.dependency_ids().map(|id| id.as_str()).collect();
/// assert_eq!(deps, vec!["auth", "fetch_page"]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationSpec {
    /// Identifier, unique within the batch
    pub id: InvocationId,
    /// Operation handed to the executor
    pub target: Target,
    /// Named arguments, possibly referencing other invocations
    #[serde(default)]
    pub arguments: BTreeMap<String, ArgValue>,
    /// Explicit ordering dependencies
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<InvocationId>,
}

impl InvocationSpec {
    /// Create an invocation with no arguments and no dependencies.
    pub fn new(id: InvocationId, target: Target) -> Self {
        Self {
            id,
            target,
            arguments: BTreeMap::new(),
            depends_on: Vec::new(),
        }
    }

    /// Create a new builder.
    pub fn builder() -> InvocationSpecBuilder {
        InvocationSpecBuilder::default()
    }

    /// Add an argument.
    pub fn with_argument(mut self, name: impl Into<String>, value: ArgValue) -> Self {
        self.arguments.insert(name.into(), value);
        self
    }

    /// Add an explicit dependency.
    pub fn with_dependency(mut self, dependency: InvocationId) -> Self {
        self.depends_on.push(dependency);
        self
    }

    /// Every id this invocation depends on: explicit dependencies first,
    /// then argument references in argument-name order. May repeat ids.
    pub fn dependency_ids(&self) -> impl Iterator<Item = &InvocationId> {
        self.depends_on.iter().chain(
            self.arguments
                .values()
                .flat_map(|arg| arg.references().map(|r| &r.invocation)),
        )
    }
}

#[derive(Debug)]
enum PendingArg {
    Value(ArgValue),
    Reference { invocation: String, path: String },
}

/// Builder for [`InvocationSpec`] that defers validation to `build()`.
#[derive(Debug, Default)]
pub struct InvocationSpecBuilder {
    id: Option<String>,
    target: Option<String>,
    arguments: Vec<(String, PendingArg)>,
    depends_on: Vec<String>,
}

impl InvocationSpecBuilder {
    /// Set the invocation id.
    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Set the target operation.
    pub fn target(mut self, target: &str) -> Self {
        self.target = Some(target.to_string());
        self
    }

    /// Add an already-built argument.
    pub fn arg(mut self, name: &str, value: ArgValue) -> Self {
        self.arguments
            .push((name.to_string(), PendingArg::Value(value)));
        self
    }

    /// Add a literal argument.
    pub fn literal(self, name: &str, value: impl Into<Value>) -> Self {
        self.arg(name, ArgValue::literal(value))
    }

    /// Add a whole-value reference to another invocation's output.
    pub fn reference(self, name: &str, invocation: &str) -> Self {
        self.reference_at(name, invocation, "")
    }

    /// Add a reference to a path inside another invocation's output.
    pub fn reference_at(mut self, name: &str, invocation: &str, path: &str) -> Self {
        self.arguments.push((
            name.to_string(),
            PendingArg::Reference {
                invocation: invocation.to_string(),
                path: path.to_string(),
            },
        ));
        self
    }

    /// Add an explicit dependency.
    pub fn depends_on(mut self, invocation: &str) -> Self {
        self.depends_on.push(invocation.to_string());
        self
    }

    /// Validate and build the invocation.
    pub fn build(self) -> Result<InvocationSpec, SpecBuildError> {
        let id = self.id.ok_or(SpecBuildError::MissingId)?;
        let id = parse_id(&id)?;
        let target = self.target.ok_or(SpecBuildError::MissingTarget)?;
        let target = Target::parse(&target).map_err(|source| SpecBuildError::InvalidTarget {
            value: target.clone(),
            source,
        })?;

        let mut spec = InvocationSpec::new(id, target);
        for (name, pending) in self.arguments {
            let value = match pending {
                PendingArg::Value(value) => value,
                PendingArg::Reference { invocation, path } => {
                    ArgValue::reference_at(parse_id(&invocation)?, OutputPath::parse(&path)?)
                }
            };
            spec.arguments.insert(name, value);
        }
        for dependency in self.depends_on {
            spec.depends_on.push(parse_id(&dependency)?);
        }

        Ok(spec)
    }
}

fn parse_id(value: &str) -> Result<InvocationId, SpecBuildError> {
    InvocationId::parse(value).map_err(|source| SpecBuildError::InvalidId {
        value: value.to_string(),
        source,
    })
}

/// Errors that can occur when building an [`InvocationSpec`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecBuildError {
    /// No id was provided.
    #[error("Invocation id is required")]
    MissingId,
    /// No target was provided.
    #[error("Invocation target is required")]
    MissingTarget,
    /// An invocation id (own, dependency or reference) is invalid.
    #[error("Invalid invocation id '{value}': {source}")]
    InvalidId {
        value: String,
        #[source]
        source: IdValidationError,
    },
    /// The target name is invalid.
    #[error("Invalid target '{value}': {source}")]
    InvalidTarget {
        value: String,
        #[source]
        source: IdValidationError,
    },
    /// A reference path is malformed.
    #[error(transparent)]
    InvalidPath(#[from] InvalidOutputPath),
}

/// Lifecycle state of an invocation within one batch.
///
/// ```text
/// Pending ──► Ready ──► Running ──► Succeeded
///    │                     │
///    │                     └──────► Failed
///    └──────► Skipped
/// ```
///
/// `Ready ──► Failed` covers reference resolution failures, which are
/// decided before the executor is called. `Ready ──► Skipped` and
/// `Running ──► Skipped` cover batch cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStatus {
    /// Waiting for dependencies
    Pending,
    /// All dependencies have a recorded result
    Ready,
    /// Handed to the executor
    Running,
    /// Completed with an output
    Succeeded,
    /// Completed with a failure
    Failed,
    /// Never executed
    Skipped,
}

impl InvocationStatus {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            InvocationStatus::Succeeded | InvocationStatus::Failed | InvocationStatus::Skipped
        )
    }

    /// Whether moving from `self` to `next` follows the lifecycle.
    pub fn can_transition_to(self, next: InvocationStatus) -> bool {
        use InvocationStatus::*;
        matches!(
            (self, next),
            (Pending, Ready)
                | (Pending, Skipped)
                | (Ready, Running)
                | (Ready, Failed)
                | (Ready, Skipped)
                | (Running, Succeeded)
                | (Running, Failed)
                | (Running, Skipped)
        )
    }

    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            InvocationStatus::Pending => "pending",
            InvocationStatus::Ready => "ready",
            InvocationStatus::Running => "running",
            InvocationStatus::Succeeded => "succeeded",
            InvocationStatus::Failed => "failed",
            InvocationStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for InvocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
