//! Shared API key check.
//!
//! Guarded HTTP routes require the `X-API-Key` header. Socket upgrades may
//! pass the key as an `api_key` query parameter instead, since browsers
//! cannot set headers on a `WebSocket` handshake.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use metrics::counter;
use sha2::digest::Output;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::errors::ApiError;
use crate::metrics::AUTH_REJECTIONS_TOTAL;
use crate::server::AppState;

/// Header carrying the shared key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// The configured key, kept only as a SHA-256 digest.
///
/// Candidates are hashed before comparison so the comparison time does not
/// depend on how many leading bytes match.
pub struct ApiKey {
    digest: Output<Sha256>,
}

impl ApiKey {
    /// Wrap the configured key.
    pub fn new(key: &str) -> Self {
        Self {
            digest: Sha256::digest(key.as_bytes()),
        }
    }

    /// Whether `candidate` is the configured key.
    pub fn matches(&self, candidate: &str) -> bool {
        Sha256::digest(candidate.as_bytes()) == self.digest
    }
}

/// Check an optional presented key against the configured one.
///
/// Passes when no key is configured.
pub fn authorize(state: &AppState, presented: Option<&str>) -> Result<(), ApiError> {
    let Some(expected) = state.api_key.as_deref() else {
        return Ok(());
    };
    if presented.is_some_and(|candidate| expected.matches(candidate)) {
        Ok(())
    } else {
        counter!(AUTH_REJECTIONS_TOTAL).increment(1);
        warn!(presented = presented.is_some(), "rejected request with bad API key");
        Err(ApiError::Auth)
    }
}

/// Key from the `X-API-Key` header, if present and valid UTF-8.
pub fn header_key(headers: &HeaderMap) -> Option<&str> {
    headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok())
}

/// Middleware for guarded routes. Runs before body validation.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(&state, header_key(request.headers()))?;
    Ok(next.run(request).await)
}
