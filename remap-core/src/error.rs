use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum RemapError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("format error at line {line}: {message}")]
    Format { line: usize, message: String },

    #[error("namespace not found: {namespace}")]
    NamespaceNotFound { namespace: String },

    #[error("cache corruption at {path}: expected {expected}, got {actual}")]
    CacheCorruption {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("build failed: {0}")]
    Build(String),

    #[error("job not found: {0}")]
    JobNotFound(Uuid),

    #[error("job {0} already settled")]
    JobTerminal(Uuid),
}

impl RemapError {
    pub fn format(line: usize, message: impl Into<String>) -> Self {
        RemapError::Format {
            line,
            message: message.into(),
        }
    }
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, RemapError>;
