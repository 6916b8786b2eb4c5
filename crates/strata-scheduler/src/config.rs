//! # Scheduler Options
//!
//! Options controlling one `execute` call: timeouts, per-level concurrency
//! and the cancellation grace period. They can be built in code, parsed
//! from TOML, or read from environment variables.
//!
//! ## Environment Variables
//!
//! - `STRATA_PER_INVOCATION_TIMEOUT` - Timeout for a single invocation (e.g. `5s`)
//! - `STRATA_MAX_CONCURRENCY` - Max concurrent invocations within one level (1-10000)
//! - `STRATA_BATCH_TIMEOUT` - Wall-clock budget for the whole batch (e.g. `2m`)
//! - `STRATA_CANCELLATION_GRACE` - How long in-flight invocations get to wind down
//!   after cancellation (default: `250ms`)
//!
//! ## TOML
//!
//! ```toml
//! per_invocation_timeout = "5s"
//! max_concurrency_per_level = 8
//! batch_timeout = "1m"
//! cancellation_grace = "100ms"
//! ```

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

/// Default time in-flight invocations get after cancellation.
pub const DEFAULT_CANCELLATION_GRACE: Duration = Duration::from_millis(250);

const ENV_PER_INVOCATION_TIMEOUT: &str = "STRATA_PER_INVOCATION_TIMEOUT";
const ENV_MAX_CONCURRENCY: &str = "STRATA_MAX_CONCURRENCY";
const ENV_BATCH_TIMEOUT: &str = "STRATA_BATCH_TIMEOUT";
const ENV_CANCELLATION_GRACE: &str = "STRATA_CANCELLATION_GRACE";

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment variable '{key}': {message}")]
    InvalidEnvVar { key: String, message: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Validated per-level concurrency limit (1-10,000)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct ConcurrencyLimit(NonZeroUsize);

impl ConcurrencyLimit {
    pub const MAX: usize = 10_000;

    pub fn new(limit: usize) -> Result<Self, ConfigError> {
        let non_zero = NonZeroUsize::new(limit).ok_or_else(|| {
            ConfigError::ValidationError("concurrency limit must be at least 1".to_string())
        })?;
        if limit > Self::MAX {
            return Err(ConfigError::ValidationError(format!(
                "concurrency limit must be at most {}",
                Self::MAX
            )));
        }
        Ok(Self(non_zero))
    }

    pub fn get(&self) -> usize {
        self.0.get()
    }
}

impl TryFrom<usize> for ConcurrencyLimit {
    type Error = ConfigError;

    fn try_from(limit: usize) -> Result<Self, Self::Error> {
        Self::new(limit)
    }
}

impl From<ConcurrencyLimit> for usize {
    fn from(limit: ConcurrencyLimit) -> Self {
        limit.get()
    }
}

impl std::fmt::Display for ConcurrencyLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Options for one scheduling call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecuteOptions {
    /// Upper bound for a single executor call (`None` = unbounded)
    #[serde(with = "crate::duration::option", skip_serializing_if = "Option::is_none")]
    pub per_invocation_timeout: Option<Duration>,
    /// Max invocations running at once within a level (`None` = level size)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrency_per_level: Option<ConcurrencyLimit>,
    /// Wall-clock budget across all levels (`None` = unbounded)
    #[serde(with = "crate::duration::option", skip_serializing_if = "Option::is_none")]
    pub batch_timeout: Option<Duration>,
    /// Time in-flight invocations get to return after cancellation
    #[serde(with = "crate::duration")]
    pub cancellation_grace: Duration,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            per_invocation_timeout: None,
            max_concurrency_per_level: None,
            batch_timeout: None,
            cancellation_grace: DEFAULT_CANCELLATION_GRACE,
        }
    }
}

impl ExecuteOptions {
    /// Create options with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-invocation timeout
    #[must_use]
    pub fn with_per_invocation_timeout(mut self, timeout: Duration) -> Self {
        self.per_invocation_timeout = Some(timeout);
        self
    }

    /// Set the per-level concurrency limit
    #[must_use]
    pub fn with_max_concurrency(mut self, limit: ConcurrencyLimit) -> Self {
        self.max_concurrency_per_level = Some(limit);
        self
    }

    /// Set the batch timeout
    #[must_use]
    pub fn with_batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout = Some(timeout);
        self
    }

    /// Set the cancellation grace period
    #[must_use]
    pub fn with_cancellation_grace(mut self, grace: Duration) -> Self {
        self.cancellation_grace = grace;
        self
    }

    /// Check that every configured timeout is non-zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.per_invocation_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::ValidationError(
                "per_invocation_timeout must be greater than zero".to_string(),
            ));
        }
        if self.batch_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::ValidationError(
                "batch_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Load options from TOML content
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let options: Self = toml::from_str(content)?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load options from `STRATA_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any variable has an invalid value or the
    /// resulting options fail validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load options through an arbitrary variable lookup, starting from
    /// defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().overlay(lookup)
    }

    /// Override fields present in `lookup`, keeping the rest.
    pub fn overlay<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(timeout) = get_duration(&lookup, ENV_PER_INVOCATION_TIMEOUT)? {
            self.per_invocation_timeout = Some(timeout);
        }
        if let Some(limit) = get_usize(&lookup, ENV_MAX_CONCURRENCY)? {
            let limit = ConcurrencyLimit::new(limit).map_err(|e| ConfigError::InvalidEnvVar {
                key: ENV_MAX_CONCURRENCY.to_string(),
                message: e.to_string(),
            })?;
            self.max_concurrency_per_level = Some(limit);
        }
        if let Some(timeout) = get_duration(&lookup, ENV_BATCH_TIMEOUT)? {
            self.batch_timeout = Some(timeout);
        }
        if let Some(grace) = get_duration(&lookup, ENV_CANCELLATION_GRACE)? {
            self.cancellation_grace = grace;
        }

        self.validate()?;
        Ok(self)
    }
}

fn get_duration<F>(lookup: &F, key: &str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => humantime::parse_duration(val.trim())
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid duration '{val}': {e}"),
            }),
        None => Ok(None),
    }
}

fn get_usize<F>(lookup: &F, key: &str) -> Result<Option<usize>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => val
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid usize value '{val}': {e}"),
            }),
        None => Ok(None),
    }
}
