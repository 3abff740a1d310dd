//! Error types for Revlight

use std::time::Duration;

use thiserror::Error;

/// Result type alias for Revlight operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Revlight operations
#[derive(Error, Debug)]
pub enum Error {
    /// Backend unreachable, connection failure, or non-success status
    #[error("Network error: {0}")]
    Network(String),

    /// Backend response is missing expected fields or is malformed
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Buffer or editor is no longer valid
    #[error("Render error: {0}")]
    Render(String),

    /// The review sequence was cancelled or superseded
    #[error("Review cancelled")]
    Cancelled,

    /// Polling gave up before the backend reported completion
    #[error("Gave up waiting for feedback after {attempts} attempts ({elapsed:?})")]
    PollTimeout { attempts: u32, elapsed: Duration },

    /// Nothing to submit
    #[error("Refusing to submit empty code")]
    EmptySubmission,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error means the sequence was abandoned on purpose
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}
