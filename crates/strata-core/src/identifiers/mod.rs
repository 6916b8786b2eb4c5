//! Validated identifier types for invocations and their targets
//!
//! Both are ASCII alphanumerics plus `-` and `_`, at most
//! [`MAX_ID_LENGTH`] chars, with `.` as a separator. Targets may also use
//! `:` so tools can be namespaced (`mcp:search`).
//!
//! # Examples
//!
//! ```rust
//! use strata_core::identifiers::{InvocationId, Target};
//!
//! let id = InvocationId::parse("fetch-weather").unwrap();
//! let target = Target::parse("http_get").unwrap();
//!
//! assert!(InvocationId::parse("").is_err());
//! assert!(Target::parse("rm -rf").is_err());
//! # let _ = (id, target);
//! ```

mod validation;

pub use validation::{IdValidationError, IdValidator, MAX_ID_LENGTH};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a single invocation, unique within a batch
///
/// Other invocations name this id in `depends_on` or in argument references.
///
/// # Examples
///
/// ```rust
/// use strata_core::identifiers::InvocationId;
///
/// let id = InvocationId::parse("summarize-1").unwrap();
/// assert_eq!(id.as_str(), "summarize-1");
///
/// let id: InvocationId = "translate".parse().unwrap();
/// assert_eq!(id.to_string(), "translate");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InvocationId(String);

impl InvocationId {
    /// Parse and validate an invocation ID from a string
    pub fn parse(id: impl AsRef<str>) -> Result<Self, IdValidationError> {
        IdValidator::INVOCATION.validate(id.as_ref()).map(|s| Self(s.to_string()))
    }

    /// Get the invocation ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Create an invocation ID without validation (for testing only)
    #[doc(hidden)]
    pub fn new_unchecked(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InvocationId {
    type Err = IdValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<InvocationId> for String {
    fn from(id: InvocationId) -> Self {
        id.0
    }
}

impl TryFrom<String> for InvocationId {
    type Error = IdValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl AsRef<str> for InvocationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Opaque name of the operation an invocation asks the executor to run
///
/// The scheduler never interprets it; it is handed to the
/// [`ToolExecutor`](crate::executor::ToolExecutor) unchanged.
///
/// Opaque does not mean free-form. Targets end up in log fields, error
/// payloads and CLI output, so they follow the same character rules as
/// [`InvocationId`] with `:` added as a namespace separator. Names such as
/// `files/read` or `weather lookup` are rejected; register them with the
/// executor as `files.read` or `weather_lookup` instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Target(String);

impl Target {
    /// Parse and validate a target name from a string
    pub fn parse(name: impl AsRef<str>) -> Result<Self, IdValidationError> {
        IdValidator::TARGET.validate(name.as_ref()).map(|s| Self(s.to_string()))
    }

    /// Get the target name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Create a target without validation (for testing only)
    #[doc(hidden)]
    pub fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Target {
    type Err = IdValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Target> for String {
    fn from(target: Target) -> Self {
        target.0
    }
}

impl TryFrom<String> for Target {
    type Error = IdValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_id_valid() {
        assert!(InvocationId::parse("a").is_ok());
        assert!(InvocationId::parse("call-1").is_ok());
        assert!(InvocationId::parse("step_2.retry").is_ok());
    }

    #[test]
    fn test_invocation_id_invalid() {
        assert!(InvocationId::parse("").is_err());
        assert!(InvocationId::parse(" call").is_err());
        assert!(InvocationId::parse("call/1").is_err());
        assert!(InvocationId::parse("a".repeat(129)).is_err());
    }

    #[test]
    fn test_target_valid() {
        assert!(Target::parse("http_get").is_ok());
        assert!(Target::parse("llm.complete").is_ok());
        assert!(Target::parse("mcp:search").is_ok());
        assert!(Target::parse("").is_err());
    }

    #[test]
    fn test_target_rejects_slashes_and_spaces() {
        assert_eq!(
            Target::parse("files/read"),
            Err(IdValidationError::InvalidChar {
                found: '/',
                position: 5
            })
        );
        assert!(Target::parse("weather lookup").is_err());
        assert!(Target::parse("files.read").is_ok());
        assert!(Target::parse("weather_lookup").is_ok());
    }

    #[test]
    fn test_serde_validates_on_deserialize() {
        let id: InvocationId = serde_json::from_str("\"fetch\"").unwrap();
        assert_eq!(id.as_str(), "fetch");

        let bad: Result<InvocationId, _> = serde_json::from_str("\"bad id\"");
        assert!(bad.is_err());

        assert_eq!(serde_json::to_string(&id).unwrap(), "\"fetch\"");
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let a = InvocationId::parse("a").unwrap();
        let b = InvocationId::parse("b").unwrap();
        assert!(a < b);
    }
}
