//! HTTP error taxonomy.
//!
//! Every error renders as JSON `{"code": ..., "message": ...}`. Rate-limit
//! rejections also carry `retryAfterSecs` and a `Retry-After` header.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use scope_core::ValidationError;
use scope_media::MediaError;
use serde_json::json;
use thiserror::Error;

/// Errors from the image upload path.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The form had no `image` file field.
    #[error("No file uploaded.")]
    NoFile,
    /// The file's MIME type is not `image/*`.
    #[error("Only image files are allowed!")]
    NotAnImage,
    /// The file exceeds the upload limit.
    #[error("File too large (limit {limit} bytes)")]
    TooLarge {
        /// Limit in bytes.
        limit: usize,
    },
    /// The multipart body could not be read.
    #[error("Malformed upload: {0}")]
    Malformed(String),
    /// Spooling the file to disk failed.
    #[error("failed to spool upload: {0}")]
    Spool(#[from] std::io::Error),
    /// The media host failed.
    #[error(transparent)]
    Media(#[from] MediaError),
}

/// Any error an HTTP handler can return.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Body failed schema validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Missing or wrong API key.
    #[error("Forbidden: invalid or missing API key")]
    Auth,
    /// Too many requests from this client.
    #[error("Too many requests, please try again in {retry_after_secs} seconds.")]
    RateLimited {
        /// Seconds until the oldest request leaves the window.
        retry_after_secs: u64,
    },
    /// Upload or listing failure.
    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Auth => StatusCode::FORBIDDEN,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Upload(err) => match err {
                UploadError::NoFile
                | UploadError::NotAnImage
                | UploadError::TooLarge { .. }
                | UploadError::Malformed(_) => StatusCode::BAD_REQUEST,
                UploadError::Spool(_) | UploadError::Media(MediaError::Io(_)) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                UploadError::Media(MediaError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
                UploadError::Media(_) => StatusCode::BAD_GATEWAY,
            },
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Auth => "AUTH_ERROR",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Upload(UploadError::Spool(_) | UploadError::Media(MediaError::Io(_))) => {
                "INTERNAL_ERROR"
            }
            Self::Upload(UploadError::Media(MediaError::NotConfigured)) => "MEDIA_NOT_CONFIGURED",
            Self::Upload(UploadError::Media(_)) => "MEDIA_ERROR",
            Self::Upload(_) => "UPLOAD_ERROR",
        }
    }

    /// Message shown to the caller. Upstream details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Upload(UploadError::Media(MediaError::NotConfigured)) => {
                "Image storage is not configured.".into()
            }
            Self::Upload(UploadError::Spool(_) | UploadError::Media(MediaError::Io(_))) => {
                "Failed to store upload.".into()
            }
            Self::Upload(UploadError::Media(_)) => "Image service request failed.".into(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = json!({
            "code": self.code(),
            "message": self.public_message(),
        });
        if let Self::RateLimited { retry_after_secs } = self {
            body["retryAfterSecs"] = json!(retry_after_secs);
            let mut response = (status, Json(body)).into_response();
            let _ = response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
            return response;
        }
        (status, Json(body)).into_response()
    }
}
