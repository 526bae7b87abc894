use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// The unified error type for the pipeline and its stages
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        field: Option<String>,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Document source unavailable: {message}")]
    SourceUnavailable {
        code: u16,
        message: String,
        collection: Option<String>,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Schema parse error: {message}")]
    SchemaParse {
        code: u16,
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Not found: {message}")]
    NotFound {
        code: u16,
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Target column '{column}' missing from {split} split")]
    MissingTarget {
        code: u16,
        column: String,
        split: String,
    },

    #[error("[E{code:04}] Storage error: {message}")]
    Storage {
        code: u16,
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Invalid input: {message}")]
    InvalidInput {
        code: u16,
        message: String,
        field: Option<String>,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Validation failed: {message}")]
    ValidationFailed {
        code: u16,
        message: String,
        report_path: Option<PathBuf>,
    },

    #[error("[E{code:04}] Worker task failed: {message}")]
    Task {
        code: u16,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },
}

impl PipelineError {
    /// Create a configuration error with default code
    pub fn config(message: impl Into<String>) -> Self {
        Self::config_with_code(ErrorCode::CONFIG_GENERIC, message, None)
    }

    /// Create a configuration error with specific code and field
    pub fn config_with_code(code: u16, message: impl Into<String>, field: Option<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            field,
            source: None,
        }
    }

    /// Create a source-unavailable error for a collection
    pub fn source_unavailable(message: impl Into<String>, collection: Option<String>) -> Self {
        Self::SourceUnavailable {
            code: ErrorCode::SOURCE_UNAVAILABLE,
            message: message.into(),
            collection,
            source: None,
        }
    }

    /// Create a schema parse error
    pub fn schema_parse(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::SchemaParse {
            code: ErrorCode::SCHEMA_PARSE,
            message: message.into(),
            path,
            source: None,
        }
    }

    /// Create a not-found error
    pub fn not_found(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::NotFound {
            code: ErrorCode::STORAGE_NOT_FOUND,
            message: message.into(),
            path,
            source: None,
        }
    }

    /// Create a missing-target error
    pub fn missing_target(column: impl Into<String>, split: impl Into<String>) -> Self {
        Self::MissingTarget {
            code: ErrorCode::DATA_MISSING_TARGET,
            column: column.into(),
            split: split.into(),
        }
    }

    /// Create a storage error with specific code and path
    pub fn storage_with_code(code: u16, message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Storage {
            code,
            message: message.into(),
            path,
            source: None,
        }
    }

    /// Create an invalid-input error with default code
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::invalid_input_with_code(ErrorCode::DATA_INVALID, message, None)
    }

    /// Create an invalid-input error with specific code and field
    pub fn invalid_input_with_code(
        code: u16,
        message: impl Into<String>,
        field: Option<String>,
    ) -> Self {
        Self::InvalidInput {
            code,
            message: message.into(),
            field,
            source: None,
        }
    }

    /// Create a validation-failed error pointing at the persisted report
    pub fn validation_failed(message: impl Into<String>, report_path: Option<PathBuf>) -> Self {
        Self::ValidationFailed {
            code: ErrorCode::STAGE_VALIDATION_FAILED,
            message: message.into(),
            report_path,
        }
    }

    /// Add a source error to this error
    pub fn with_source(mut self, source: impl Into<BoxedSource>) -> Self {
        match &mut self {
            Self::Config { source: src, .. }
            | Self::SourceUnavailable { source: src, .. }
            | Self::SchemaParse { source: src, .. }
            | Self::NotFound { source: src, .. }
            | Self::Storage { source: src, .. }
            | Self::InvalidInput { source: src, .. }
            | Self::Task { source: src, .. } => {
                *src = Some(source.into());
            }
            Self::MissingTarget { .. } | Self::ValidationFailed { .. } => {}
        }
        self
    }

    /// Add context to the error message
    pub fn with_context(mut self, context: impl Display) -> Self {
        match &mut self {
            Self::Config { message, .. }
            | Self::SourceUnavailable { message, .. }
            | Self::SchemaParse { message, .. }
            | Self::NotFound { message, .. }
            | Self::Storage { message, .. }
            | Self::InvalidInput { message, .. }
            | Self::ValidationFailed { message, .. }
            | Self::Task { message, .. } => {
                *message = format!("{}: {}", message, context);
            }
            Self::MissingTarget { .. } => {}
        }
        self
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 2,
            Self::SourceUnavailable { .. } => 3,
            Self::Storage { .. } => 4,
            Self::NotFound { .. } => 5,
            Self::SchemaParse { .. } => 6,
            Self::MissingTarget { .. } | Self::InvalidInput { .. } => 7,
            Self::ValidationFailed { .. } => 8,
            Self::Task { .. } => 1,
        }
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Config { code, .. }
            | Self::SourceUnavailable { code, .. }
            | Self::SchemaParse { code, .. }
            | Self::NotFound { code, .. }
            | Self::MissingTarget { code, .. }
            | Self::Storage { code, .. }
            | Self::InvalidInput { code, .. }
            | Self::ValidationFailed { code, .. }
            | Self::Task { code, .. } => *code,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Config { message, field, .. } => match field {
                Some(f) => format!("Configuration problem with '{}': {}", f, message),
                None => format!("Configuration problem: {}", message),
            },
            Self::SourceUnavailable {
                message,
                collection,
                ..
            } => match collection {
                Some(c) => format!("Could not read collection '{}': {}", c, message),
                None => format!("Document source unavailable: {}", message),
            },
            Self::SchemaParse { message, path, .. } => match path {
                Some(p) => format!("Schema at {} is malformed: {}", p.display(), message),
                None => format!("Schema is malformed: {}", message),
            },
            Self::NotFound { message, path, .. } => match path {
                Some(p) => format!("{} ({})", message, p.display()),
                None => message.clone(),
            },
            Self::MissingTarget { column, split, .. } => {
                format!("Target column '{}' is missing from the {} split", column, split)
            }
            Self::Storage { message, path, .. } => match path {
                Some(p) => format!("Storage error at {}: {}", p.display(), message),
                None => format!("Storage error: {}", message),
            },
            Self::InvalidInput { message, field, .. } => match field {
                Some(f) => format!("Invalid value in '{}': {}", f, message),
                None => format!("Invalid input: {}", message),
            },
            Self::ValidationFailed {
                message,
                report_path,
                ..
            } => match report_path {
                Some(p) => format!("{} (see {})", message, p.display()),
                None => message.clone(),
            },
            Self::Task { message, .. } => format!("Worker task failed: {}", message),
        }
    }

    /// Get a developer-friendly error message with full chain
    pub fn developer_message(&self) -> String {
        let mut out = self.to_string();
        let mut current = std::error::Error::source(self);
        while let Some(cause) = current {
            out.push_str(&format!("\n  caused by: {}", cause));
            current = cause.source();
        }
        out
    }

    /// Check if this is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        let code = if err.kind() == std::io::ErrorKind::NotFound {
            ErrorCode::STORAGE_NOT_FOUND
        } else {
            ErrorCode::STORAGE_IO_ERROR
        };
        Self::storage_with_code(code, err.to_string(), None).with_source(err)
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(err: tokio::task::JoinError) -> Self {
        let message = if err.is_panic() {
            "blocking task panicked"
        } else {
            "blocking task was cancelled"
        };
        Self::Task {
            code: ErrorCode::STAGE_TASK_FAILED,
            message: message.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

/// Type alias for Results using PipelineError
pub type Result<T> = std::result::Result<T, PipelineError>;
