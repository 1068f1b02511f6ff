//! Client error types.

use std::path::Path;

use coursecal_core::{LoggingError, ValidationError};
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A data file holds malformed JSON.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Command output could not be serialized.
    #[error("failed to serialize output: {0}")]
    Output(#[source] serde_json::Error),

    /// The engine rejected malformed input.
    #[error("invalid event: {0}")]
    Validation(#[from] ValidationError),

    /// No stored event has the requested id.
    #[error("event not found: {0}")]
    EventNotFound(String),

    /// The change raised warnings and was not forced.
    #[error("not saved: {0} warning(s) raised, pass --force to save anyway")]
    Unconfirmed(usize),

    /// Logging could not be initialized.
    #[error("logging setup failed: {0}")]
    Logging(#[from] LoggingError),
}

impl ClientError {
    /// Creates a JSON error for the given file.
    pub fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.display().to_string(),
            source,
        }
    }
}
