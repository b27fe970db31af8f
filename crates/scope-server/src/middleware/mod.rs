//! Request guards for the authenticated deployment.

pub mod auth;
pub mod rate_limit;

pub use auth::{API_KEY_HEADER, ApiKey, require_api_key};
pub use rate_limit::{SlidingWindowLimiter, enforce_rate_limit};
