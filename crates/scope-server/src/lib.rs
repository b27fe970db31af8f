//! # scope-server
//!
//! Axum HTTP + `WebSocket` relay for the portable microscope.
//!
//! - HTTP ingestion: `POST /sensor-data`, `POST /image-action`
//! - Socket transports: raw relay peers on `/`, viewer event stream on `/ws`
//! - Broadcast fan-out through a shared connection registry
//! - Image proxy routes backed by a `MediaStore`
//! - Optional API key and sliding-window rate limit guards
//! - Health, Prometheus metrics, graceful shutdown

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod health;
pub mod images;
pub mod ingest;
pub mod metrics;
pub mod middleware;
pub mod server;
pub mod shutdown;
pub mod websocket;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{RateLimitConfig, ServerConfig};
pub use errors::{ApiError, UploadError};
pub use server::{AppState, RelayServer, ServerHandle};
