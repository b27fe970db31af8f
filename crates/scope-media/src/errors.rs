//! Media store errors.

use thiserror::Error;

/// Errors from the hosted media service.
#[derive(Debug, Error)]
pub enum MediaError {
    /// No credentials were configured.
    #[error("media storage is not configured")]
    NotConfigured,
    /// The request could not be sent or the response not read.
    #[error("media service request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The service answered with a non-success status.
    #[error("media service returned {status}: {body}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Response body, for logs.
        body: String,
    },
    /// The service answered with an unexpected body.
    #[error("unexpected media service response: {0}")]
    Decode(String),
    /// Reading the spooled upload failed.
    #[error("failed to read upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for media operations.
pub type Result<T> = std::result::Result<T, MediaError>;
