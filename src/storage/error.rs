//! Error types for the artifact store

use crate::error::{ErrorCode, PipelineError};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O operation failed
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Run or artifact not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Identifier does not look like a run id
    #[error("Invalid run id: {0}")]
    InvalidRunId(String),
}

impl StorageError {
    /// Wrap an I/O error with the path it concerned
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error
    pub fn serialization<E: fmt::Display>(err: E) -> Self {
        Self::Serialization(err.to_string())
    }

    /// Create a not found error
    pub fn not_found<E: fmt::Display>(item: E) -> Self {
        Self::NotFound(item.to_string())
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err)
    }
}

impl From<serde_yaml::Error> for StorageError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::serialization(err)
    }
}

/// Convert StorageError to PipelineError
impl From<StorageError> for PipelineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(message) => PipelineError::not_found(message, None),
            StorageError::InvalidRunId(id) => PipelineError::config_with_code(
                ErrorCode::CONFIG_INVALID_VALUE,
                format!("'{}' is not a run id (expected YYYYMMDD_HHMMSS)", id),
                Some("run_id".to_string()),
            ),
            StorageError::Io { path, source } => {
                if source.kind() == std::io::ErrorKind::NotFound {
                    PipelineError::not_found(source.to_string(), Some(path)).with_source(source)
                } else {
                    PipelineError::storage_with_code(
                        ErrorCode::STORAGE_IO_ERROR,
                        source.to_string(),
                        Some(path),
                    )
                    .with_source(source)
                }
            }
            StorageError::Serialization(message) => PipelineError::storage_with_code(
                ErrorCode::STORAGE_SERIALIZATION_ERROR,
                message,
                None,
            ),
        }
    }
}
