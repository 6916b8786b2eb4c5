//! Argument values and reference placeholders.
//!
//! An argument is either a literal JSON value, a whole-value reference to
//! another invocation's output, or a template string whose reference parts
//! are interpolated. Literals are never scanned for placeholders: the only
//! way to depend on another invocation's output is an explicit
//! [`Reference`].

use crate::identifiers::InvocationId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Error returned when an output path string is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid output path '{path}': segments must be non-empty")]
pub struct InvalidOutputPath {
    /// The rejected path string
    pub path: String,
}

/// Dot-separated path into an invocation's JSON output.
///
/// The empty path addresses the whole output. Numeric segments index into
/// arrays, every other segment indexes object keys.
///
/// There is no escape syntax: `.` always separates segments and empty
/// segments are rejected. Object keys that contain a dot or are empty cannot
/// be addressed; reference the enclosing object instead and let the executor
/// pick the key.
///
/// ```rust
/// use strata_core::argument::OutputPath;
/// use serde_json::json;
///
/// let output = json!({"items": [{"name": "first"}]});
/// let path = OutputPath::parse("items.0.name").unwrap();
/// assert_eq!(path.lookup(&output), Some(&json!("first")));
/// assert_eq!(OutputPath::root().lookup(&output), Some(&output));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OutputPath(Vec<String>);

impl OutputPath {
    /// The path addressing the whole output.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parse a dot-separated path. The empty string is the root path.
    pub fn parse(path: &str) -> Result<Self, InvalidOutputPath> {
        if path.is_empty() {
            return Ok(Self::root());
        }

        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(InvalidOutputPath {
                path: path.to_string(),
            });
        }
        Ok(Self(segments))
    }

    /// Whether this path addresses the whole output.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Path segments in order.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Walk `value` along this path.
    pub fn lookup<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        self.0
            .iter()
            .try_fold(value, |current, segment| match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|idx| items.get(idx)),
                _ => None,
            })
    }
}

impl fmt::Display for OutputPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl TryFrom<String> for OutputPath {
    type Error = InvalidOutputPath;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<OutputPath> for String {
    fn from(path: OutputPath) -> Self {
        path.to_string()
    }
}

/// A placeholder for (part of) another invocation's output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    /// The invocation whose output is referenced
    pub invocation: InvocationId,
    /// Where inside that output to look
    #[serde(default, skip_serializing_if = "OutputPath::is_root")]
    pub path: OutputPath,
}

impl Reference {
    /// Reference the whole output of `invocation`.
    pub fn whole(invocation: InvocationId) -> Self {
        Self {
            invocation,
            path: OutputPath::root(),
        }
    }

    /// Reference the value at `path` inside the output of `invocation`.
    pub fn at(invocation: InvocationId, path: OutputPath) -> Self {
        Self { invocation, path }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_root() {
            write!(f, "{}", self.invocation)
        } else {
            write!(f, "{}.{}", self.invocation, self.path)
        }
    }
}

/// One piece of a template argument.
///
/// Serialized untagged: a JSON string is text, an object with an
/// `invocation` field is a reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplatePart {
    /// Text copied verbatim
    Text(String),
    /// Reference interpolated by string coercion
    Reference(Reference),
}

impl TemplatePart {
    /// The reference carried by this part, if any.
    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            TemplatePart::Text(_) => None,
            TemplatePart::Reference(r) => Some(r),
        }
    }
}

/// A single invocation argument.
///
/// ```rust
/// use strata_core::argument::ArgValue;
/// use strata_core::identifiers::InvocationId;
///
/// let search = InvocationId::parse("search").unwrap();
/// let arg = ArgValue::reference(search.clone());
/// assert_eq!(arg.references().count(), 1);
///
/// let literal = ArgValue::literal("{{search}}");
/// assert_eq!(literal.references().count(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArgValue {
    /// A literal JSON value passed through unchanged
    Literal {
        /// The value
        value: Value,
    },
    /// Replaced by the typed value found at the reference
    Reference(Reference),
    /// A string built from text and string-coerced references
    Template {
        /// Parts concatenated in order
        parts: Vec<TemplatePart>,
    },
}

impl ArgValue {
    /// Create a literal argument.
    pub fn literal(value: impl Into<Value>) -> Self {
        ArgValue::Literal {
            value: value.into(),
        }
    }

    /// Reference the whole output of another invocation.
    pub fn reference(invocation: InvocationId) -> Self {
        ArgValue::Reference(Reference::whole(invocation))
    }

    /// Reference a path inside another invocation's output.
    pub fn reference_at(invocation: InvocationId, path: OutputPath) -> Self {
        ArgValue::Reference(Reference::at(invocation, path))
    }

    /// Create a template argument.
    pub fn template(parts: impl IntoIterator<Item = TemplatePart>) -> Self {
        ArgValue::Template {
            parts: parts.into_iter().collect(),
        }
    }

    /// Every reference carried by this argument, in order of appearance.
    pub fn references(&self) -> impl Iterator<Item = &Reference> {
        let (single, parts): (Option<&Reference>, &[TemplatePart]) = match self {
            ArgValue::Literal { .. } => (None, &[]),
            ArgValue::Reference(r) => (Some(r), &[]),
            ArgValue::Template { parts } => (None, parts.as_slice()),
        };
        single
            .into_iter()
            .chain(parts.iter().filter_map(TemplatePart::as_reference))
    }
}

impl From<Value> for ArgValue {
    fn from(value: Value) -> Self {
        ArgValue::Literal { value }
    }
}

/// Render a JSON value for interpolation into a template.
///
/// Strings are inserted without quotes; every other value is rendered as
/// compact JSON.
pub fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
