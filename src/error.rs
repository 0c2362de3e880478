//! Error types for the drive_reconcile crate.

use thiserror::Error;

/// Errors that can occur when talking to the remote store.
#[derive(Error, Debug)]
pub enum DriveError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("JWT encoding error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Transfer ended after {received} of {expected} bytes")]
    IncompleteTransfer { expected: u64, received: u64 },

    #[error("Failed to decode response JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid URL or ID: {0}")]
    InvalidUrlOrId(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Coarse classification of a [`DriveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request was malformed and rejected before any remote call.
    InvalidArgument,
    /// Credentials could not be loaded or exchanged for a token.
    Authentication,
    /// The remote store (or the network in front of it) reported a failure.
    RemoteStore,
    /// A lookup that expected a result found none.
    NotFound,
    /// Reading or writing a local file failed.
    LocalIo,
}

impl DriveError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DriveError::InvalidArgument(_) | DriveError::InvalidUrlOrId(_) => {
                ErrorKind::InvalidArgument
            }
            DriveError::AuthenticationError(_)
            | DriveError::MissingEnvVar(_)
            | DriveError::JwtError(_) => ErrorKind::Authentication,
            DriveError::HttpError(_)
            | DriveError::ApiError { .. }
            | DriveError::IncompleteTransfer { .. }
            | DriveError::JsonError(_) => ErrorKind::RemoteStore,
            DriveError::NotFound(_) => ErrorKind::NotFound,
            DriveError::IoError(_) => ErrorKind::LocalIo,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        DriveError::InvalidArgument(message.into())
    }
}

/// Result type alias for DriveError.
pub type Result<T> = std::result::Result<T, DriveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let api = DriveError::ApiError {
            status: 403,
            message: "quota".to_string(),
        };
        assert_eq!(api.kind(), ErrorKind::RemoteStore);
        let short = DriveError::IncompleteTransfer {
            expected: 10,
            received: 4,
        };
        assert_eq!(short.kind(), ErrorKind::RemoteStore);
        assert_eq!(
            DriveError::invalid("bad").kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            DriveError::MissingEnvVar("X".to_string()).kind(),
            ErrorKind::Authentication
        );
        assert_eq!(
            DriveError::NotFound("folder".to_string()).kind(),
            ErrorKind::NotFound
        );
    }
}
