//! Batch files and CLI errors

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strata::{ConfigError, InvocationSpec, StructuralError};

/// Errors surfaced by CLI commands
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Failed to read batch file '{path}': {source}")]
    ReadBatch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid batch file '{path}': {source}")]
    ParseBatch {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

impl CliError {
    /// Process exit code: 2 for batches that cannot be scheduled, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Structural(_) => 2,
            _ => 1,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            CliError::ReadBatch { .. } => "read_batch",
            CliError::ParseBatch { .. } => "parse_batch",
            CliError::Config(_) => "config",
            CliError::Structural(err) => err.code(),
            CliError::Output(_) => "output",
            CliError::Runtime(_) => "runtime",
        }
    }
}

/// On-disk batch: `{ "invocations": [...] }`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchFile {
    pub invocations: Vec<InvocationSpec>,
}

impl BatchFile {
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let content = std::fs::read_to_string(path).map_err(|source| CliError::ReadBatch {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| CliError::ParseBatch {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use strata::ArgValue;

    const BATCH: &str = r#"{
        "invocations": [
            {"id": "a", "target": "echo", "arguments": {"text": {"type": "literal", "value": "hi"}}},
            {"id": "b", "target": "uppercase",
             "arguments": {"text": {"type": "reference", "invocation": "a", "path": "text"}}},
            {"id": "c", "target": "echo", "depends_on": ["b"]}
        ]
    }"#;

    #[test]
    fn test_parse_batch() {
        let batch = BatchFile::parse(BATCH).unwrap();
        assert_eq!(batch.invocations.len(), 3);
        assert_eq!(batch.invocations[2].depends_on.len(), 1);
        assert!(matches!(
            batch.invocations[1].arguments.get("text"),
            Some(ArgValue::Reference(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_ids() {
        let err = BatchFile::parse(r#"{"invocations": [{"id": "../x", "target": "echo"}]}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_load_errors() {
        let err = BatchFile::load(Path::new("/nonexistent/batch.json")).unwrap_err();
        assert_eq!(err.error_code(), "read_batch");
        assert_eq!(err.exit_code(), 1);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"invocations\": 3}}").unwrap();
        let err = BatchFile::load(file.path()).unwrap_err();
        assert_eq!(err.error_code(), "parse_batch");
    }

    #[test]
    fn test_structural_exit_code() {
        let err = CliError::from(StructuralError::SelfDependency {
            invocation: strata::InvocationId::parse("a").unwrap(),
        });
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.error_code(), "self_dependency");
    }
}
