//! Error taxonomy for the analysis workflow.
//!
//! Every variant here is recoverable: the workflow turns each one into a single
//! notice and leaves the UI ready for another attempt.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a GitHub repository link")]
    EmptyInput,
    #[error("Malformed GitHub link, expected: https://github.com/<owner>/<repository>")]
    MalformedReference,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("request timed out")]
    Timeout,
    #[error("request cancelled")]
    Cancelled,
    #[error("{0}")]
    Server(String),
    #[error("network failure: {0}")]
    NetworkFailure(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no report available to export")]
    NoReportAvailable,
    #[error("export timed out")]
    Timeout,
    #[error("{0}")]
    Transport(String),
    #[error("failed to save download: {0}")]
    Save(#[from] std::io::Error),
}

/// Failure reported by a [`crate::transport::Transport`] before any response
/// status is available.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("operation aborted")]
    Aborted,
    #[error("{0}")]
    Network(String),
}

impl From<TransportError> for RequestError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Aborted => RequestError::Cancelled,
            TransportError::Network(msg) => RequestError::NetworkFailure(msg),
        }
    }
}
