//! Character and length rules shared by invocation ids and targets

use thiserror::Error;

/// Longest identifier accepted anywhere in a batch
pub const MAX_ID_LENGTH: usize = 128;

/// Why a candidate identifier was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdValidationError {
    #[error("identifier is empty")]
    Empty,
    #[error("identifier is {length} chars, limit is {max}")]
    TooLong { length: usize, max: usize },
    #[error("identifier has {found:?} at position {position}")]
    InvalidChar { found: char, position: usize },
    #[error("identifier must not start or end with a separator")]
    DanglingSeparator,
    #[error("identifier must not repeat separators")]
    RepeatedSeparator,
}

/// Rule set for one kind of identifier.
///
/// Identifiers are made of ASCII alphanumerics plus `-` and `_`, joined by
/// the kind's separators. Separators may not lead, trail or repeat, which
/// also rules out relative path fragments such as `..`.
#[derive(Debug, Clone, Copy)]
pub struct IdValidator {
    separators: &'static [char],
}

impl IdValidator {
    /// Invocation ids: `fetch-user`, `step_2.retry`
    pub const INVOCATION: Self = Self { separators: &['.'] };

    /// Targets may be namespaced: `llm.complete`, `mcp:search`
    pub const TARGET: Self = Self {
        separators: &['.', ':'],
    };

    /// Check `id` against this rule set.
    ///
    /// ```rust
    /// use strata_core::identifiers::IdValidator;
    ///
    /// assert!(IdValidator::INVOCATION.validate("step_2.retry").is_ok());
    /// assert!(IdValidator::TARGET.validate("mcp:search").is_ok());
    ///
    /// assert!(IdValidator::INVOCATION.validate("mcp:search").is_err());
    /// assert!(IdValidator::INVOCATION.validate("../etc").is_err());
    /// assert!(IdValidator::TARGET.validate("rm -rf").is_err());
    /// ```
    pub fn validate(self, id: &str) -> Result<&str, IdValidationError> {
        if id.is_empty() {
            return Err(IdValidationError::Empty);
        }
        let length = id.chars().count();
        if length > MAX_ID_LENGTH {
            return Err(IdValidationError::TooLong {
                length,
                max: MAX_ID_LENGTH,
            });
        }

        let mut previous_was_separator = true;
        for (position, found) in id.chars().enumerate() {
            let separator = self.separators.contains(&found);
            if separator {
                if position == 0 {
                    return Err(IdValidationError::DanglingSeparator);
                }
                if previous_was_separator {
                    return Err(IdValidationError::RepeatedSeparator);
                }
            } else if !(found.is_ascii_alphanumeric() || found == '-' || found == '_') {
                return Err(IdValidationError::InvalidChar { found, position });
            }
            previous_was_separator = separator;
        }

        if previous_was_separator {
            return Err(IdValidationError::DanglingSeparator);
        }
        Ok(id)
    }
}
