//! Error types for sqlproc

use thiserror::Error;

use crate::MarshalError;

/// Core error type for sqlproc operations
#[derive(Error, Debug)]
pub enum SqlProcError {
    /// An argument could not be turned into a SQL literal. Nothing was sent.
    #[error(transparent)]
    Marshal(#[from] MarshalError),

    #[error("Connection error: {0}")]
    Connection(String),

    /// The driver rejected or failed to run a statement.
    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("{0}")]
    Other(String),
}

impl SqlProcError {
    /// Whether the error came from the connection itself rather than the statement.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, SqlProcError::Connection(_) | SqlProcError::Io(_))
    }
}

/// Result type alias for sqlproc operations
pub type Result<T> = std::result::Result<T, SqlProcError>;
