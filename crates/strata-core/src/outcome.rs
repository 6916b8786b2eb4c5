//! Per-invocation outcomes.
//!
//! Every invocation in a batch that passed structural validation ends with
//! exactly one [`InvocationResult`]. Execution problems are values here,
//! never errors that abort the batch.

use crate::identifiers::InvocationId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Skip reason used when a batch is cancelled or times out.
pub const BATCH_CANCELLED: &str = "batch cancelled";

/// Category of an invocation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The executor returned an error or panicked
    Execution,
    /// The per-invocation timeout elapsed
    Timeout,
    /// A referenced output path was not present in the dependency's output
    Resolution,
}

impl FailureKind {
    /// Machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            FailureKind::Execution => "execution",
            FailureKind::Timeout => "timeout",
            FailureKind::Resolution => "resolution",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Terminal outcome of one invocation.
///
/// ```rust
/// use strata_core::{FailureKind, Outcome};
/// use serde_json::json;
///
/// let ok = Outcome::success(json!({"temp": 21}));
/// assert!(ok.is_success());
///
/// let failed = Outcome::failure(FailureKind::Timeout, "timed out after 5s");
/// assert_eq!(failed.failure_kind(), Some(FailureKind::Timeout));
///
/// let skipped = Outcome::skipped("dependency failed: fetch");
/// assert_eq!(skipped.skip_reason(), Some("dependency failed: fetch"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The executor produced a value
    Success {
        /// The executor's output
        value: Value,
    },
    /// The invocation ran (or tried to) and failed
    Failure {
        /// Failure category
        kind: FailureKind,
        /// Human-readable detail
        detail: String,
    },
    /// The invocation was never executed
    Skipped {
        /// Why it was skipped
        reason: String,
    },
}

impl Outcome {
    /// Create a success outcome.
    pub fn success(value: Value) -> Self {
        Outcome::Success { value }
    }

    /// Create a failure outcome.
    pub fn failure(kind: FailureKind, detail: impl Into<String>) -> Self {
        Outcome::Failure {
            kind,
            detail: detail.into(),
        }
    }

    /// Create a skipped outcome.
    pub fn skipped(reason: impl Into<String>) -> Self {
        Outcome::Skipped {
            reason: reason.into(),
        }
    }

    /// Skipped because the batch was cancelled.
    pub fn cancelled() -> Self {
        Self::skipped(BATCH_CANCELLED)
    }

    /// Check if the invocation succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Check if the invocation failed.
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure { .. })
    }

    /// Check if the invocation was skipped.
    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped { .. })
    }

    /// The output value, if successful.
    pub fn output(&self) -> Option<&Value> {
        match self {
            Outcome::Success { value } => Some(value),
            _ => None,
        }
    }

    /// The failure kind, if failed.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Outcome::Failure { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// The failure detail, if failed.
    pub fn failure_detail(&self) -> Option<&str> {
        match self {
            Outcome::Failure { detail, .. } => Some(detail),
            _ => None,
        }
    }

    /// The skip reason, if skipped.
    pub fn skip_reason(&self) -> Option<&str> {
        match self {
            Outcome::Skipped { reason } => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success { .. } => write!(f, "success"),
            Outcome::Failure { kind, detail } => write!(f, "failure ({}): {}", kind, detail),
            Outcome::Skipped { reason } => write!(f, "skipped: {}", reason),
        }
    }
}

/// The outcome of one invocation, tagged with its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResult {
    /// Which invocation this result belongs to
    pub invocation_id: InvocationId,
    /// What happened
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl InvocationResult {
    /// Pair an outcome with its invocation id.
    pub fn new(invocation_id: InvocationId, outcome: Outcome) -> Self {
        Self {
            invocation_id,
            outcome,
        }
    }

    /// Check if the invocation succeeded.
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Check if the invocation failed.
    pub fn is_failure(&self) -> bool {
        self.outcome.is_failure()
    }

    /// Check if the invocation was skipped.
    pub fn is_skipped(&self) -> bool {
        self.outcome.is_skipped()
    }

    /// The output value, if successful.
    pub fn output(&self) -> Option<&Value> {
        self.outcome.output()
    }

    /// The failure kind, if failed.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.outcome.failure_kind()
    }

    /// The skip reason, if skipped.
    pub fn skip_reason(&self) -> Option<&str> {
        self.outcome.skip_reason()
    }
}
