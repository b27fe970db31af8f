//! # scope-settings
//!
//! Relay configuration loaded in three layers:
//!
//! 1. Compiled defaults ([`RelaySettings::default()`])
//! 2. An optional JSON settings file, deep-merged over the defaults
//! 3. Environment variable overrides
//!
//! Settings are passed explicitly to the components that need them; there
//! is no global instance.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{apply_env_overrides, load_settings_from_path, validate};
pub use types::{
    AuthSettings, LogFormat, LoggingSettings, MediaSettings, RateLimitSettings, RelaySettings,
    ServerSettings,
};
