//! Error handling for the cdx CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Reading, writing or analysing a CDX file failed
    #[error("{0}")]
    Storage(#[from] cdx_storage::StorageError),

    /// Configuration file missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Config or result file I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON rendering failed
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Argument combination rejected before touching any file
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),
}

impl CliError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid arguments error
    pub fn invalid_args(msg: impl Into<String>) -> Self {
        Self::InvalidArgs(msg.into())
    }
}
