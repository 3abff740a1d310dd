//! Error types for review backend operations

use std::time::Duration;

use thiserror::Error;

/// Result type for review backend operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the review backend
#[derive(Error, Debug)]
pub enum Error {
    /// Connection, DNS, timeout, or transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("Backend returned {status} for {url}: {message}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
        message: String,
    },

    /// Response body did not have the expected shape
    #[error("Unexpected backend response: {0}")]
    Protocol(String),

    /// Backend URL could not be used
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),

    /// Polling was cancelled
    #[error("Polling cancelled")]
    Cancelled,

    /// Polling budget exhausted
    #[error("Feedback not ready after {attempts} attempts ({elapsed:?})")]
    Timeout { attempts: u32, elapsed: Duration },

    /// Nothing to submit
    #[error("Refusing to submit empty code")]
    EmptySubmission,
}

impl From<Error> for revlight_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Http(e) => revlight_core::Error::Network(e.to_string()),
            e @ Error::Status { .. } => revlight_core::Error::Network(e.to_string()),
            Error::Protocol(msg) => revlight_core::Error::Protocol(msg),
            Error::InvalidUrl(msg) => revlight_core::Error::Config(msg),
            Error::Cancelled => revlight_core::Error::Cancelled,
            Error::Timeout { attempts, elapsed } => {
                revlight_core::Error::PollTimeout { attempts, elapsed }
            }
            Error::EmptySubmission => revlight_core::Error::EmptySubmission,
        }
    }
}

impl From<revlight_core::Error> for Error {
    fn from(err: revlight_core::Error) -> Self {
        match err {
            revlight_core::Error::Cancelled => Error::Cancelled,
            revlight_core::Error::EmptySubmission => Error::EmptySubmission,
            revlight_core::Error::PollTimeout { attempts, elapsed } => {
                Error::Timeout { attempts, elapsed }
            }
            revlight_core::Error::Config(msg) => Error::InvalidUrl(msg),
            revlight_core::Error::Protocol(msg) => Error::Protocol(msg),
            other => Error::Protocol(other.to_string()),
        }
    }
}
