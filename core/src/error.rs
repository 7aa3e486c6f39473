//! Error types and handling for pickr core

use thiserror::Error;

/// Result type alias for pickr operations
pub type Result<T> = std::result::Result<T, SelectError>;

/// Main error type for pickr core
#[derive(Error, Debug)]
pub enum SelectError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Host capability errors (search or lookup)
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// The control task has shut down and no longer accepts commands
    #[error("Select control is closed")]
    Closed,

    /// A newer `write_value` replaced this one before it resolved
    #[error("Value write was superseded by a newer one")]
    Superseded,
}

/// Configuration-specific errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for field '{field}': {value}")]
    InvalidValue { field: String, value: String },

    #[error("Unknown reference mode: {0}")]
    UnknownReferenceMode(String),
}

/// Errors reported by host-supplied data capabilities
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("Search failed for term '{term}': {message}")]
    SearchFailed { term: String, message: String },

    #[error("Lookup failed: {message}")]
    LookupFailed { message: String },
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for SelectError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        SelectError::Closed
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for SelectError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        SelectError::Closed
    }
}
