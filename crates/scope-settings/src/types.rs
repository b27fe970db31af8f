//! Settings structs.
//!
//! Every struct uses `#[serde(default)]` so a partial settings file only
//! needs to name the values it changes. Keys are camelCase on disk.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelaySettings {
    /// Network and socket settings.
    pub server: ServerSettings,
    /// Shared API key authentication.
    pub auth: AuthSettings,
    /// Sliding-window request limits.
    pub rate_limit: RateLimitSettings,
    /// Hosted media (upload proxy) settings.
    pub media: MediaSettings,
    /// Log level and output format.
    pub logging: LoggingSettings,
}

impl RelaySettings {
    /// Whether guarded routes are rate limited. Authentication always
    /// brings the limiter with it.
    pub fn rate_limit_active(&self) -> bool {
        self.rate_limit.enabled || self.auth.enabled
    }
}

/// Server network and socket settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// HTTP and socket port.
    pub port: u16,
    /// Largest accepted socket frame in bytes.
    pub max_message_size: usize,
    /// Outbound buffer per socket connection, in messages.
    pub send_queue_capacity: usize,
    /// Seconds between heartbeat pings.
    pub heartbeat_interval_secs: u64,
    /// Seconds without a pong before a socket is dropped.
    pub heartbeat_timeout_secs: u64,
    /// Serve the raw relay socket on `/`.
    pub socket_relay: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_message_size: 64 * 1024,
            send_queue_capacity: 256,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            socket_relay: true,
        }
    }
}

/// Shared API key authentication.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthSettings {
    /// Require `X-API-Key` on ingestion and image requests.
    pub enabled: bool,
    /// The shared key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("enabled", &self.enabled)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Sliding-window rate limit applied per client.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RateLimitSettings {
    /// Enforce the limit even without authentication.
    pub enabled: bool,
    /// Requests allowed per window.
    pub max_requests: usize,
    /// Window length in seconds.
    pub window_secs: u64,
    /// Identify clients by the first `X-Forwarded-For` address.
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            max_requests: 600,
            window_secs: 60,
            trust_forwarded_for: false,
        }
    }
}

/// Hosted media service settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaSettings {
    /// Cloud (account) name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_name: Option<String>,
    /// API key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// API secret used to sign uploads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,
    /// Folder uploads are stored in and listings are filtered by.
    pub folder: String,
    /// Number of images returned by a listing.
    pub list_limit: usize,
    /// Largest accepted upload in bytes.
    pub max_upload_bytes: usize,
    /// API base URL.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl MediaSettings {
    /// Whether all three credentials are present.
    pub fn is_configured(&self) -> bool {
        [&self.cloud_name, &self.api_key, &self.api_secret]
            .iter()
            .all(|v| v.as_deref().is_some_and(|s| !s.is_empty()))
    }
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            cloud_name: None,
            api_key: None,
            api_secret: None,
            folder: "mikroskop-portable-images".to_string(),
            list_limit: 10,
            max_upload_bytes: 10 * 1024 * 1024,
            base_url: "https://api.cloudinary.com".to_string(),
            timeout_secs: 30,
        }
    }
}

impl fmt::Debug for MediaSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaSettings")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_secret", &self.api_secret.as_ref().map(|_| "<redacted>"))
            .field("folder", &self.folder)
            .field("list_limit", &self.list_limit)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_defaults() {
        let s = ServerSettings::default();
        assert_eq!(s.port, 3000);
        assert_eq!(s.host, "0.0.0.0");
        assert_eq!(s.send_queue_capacity, 256);
        assert!(s.socket_relay);
    }

    #[test]
    fn rate_limit_defaults() {
        let r = RateLimitSettings::default();
        assert!(!r.enabled);
        assert_eq!(r.max_requests, 600);
        assert_eq!(r.window_secs, 60);
    }

    #[test]
    fn media_defaults() {
        let m = MediaSettings::default();
        assert_eq!(m.folder, "mikroskop-portable-images");
        assert_eq!(m.list_limit, 10);
        assert_eq!(m.max_upload_bytes, 10 * 1024 * 1024);
        assert!(!m.is_configured());
    }

    #[test]
    fn media_configured_requires_all_credentials() {
        let mut m = MediaSettings {
            cloud_name: Some("demo".into()),
            api_key: Some("key".into()),
            ..MediaSettings::default()
        };
        assert!(!m.is_configured());
        m.api_secret = Some(String::new());
        assert!(!m.is_configured());
        m.api_secret = Some("secret".into());
        assert!(m.is_configured());
    }

    #[test]
    fn debug_redacts_secrets() {
        let auth = AuthSettings {
            enabled: true,
            api_key: Some("hunter2".into()),
        };
        let media = MediaSettings {
            api_secret: Some("s3cret".into()),
            ..MediaSettings::default()
        };
        assert!(!format!("{auth:?}").contains("hunter2"));
        assert!(!format!("{media:?}").contains("s3cret"));
    }

    #[test]
    fn camel_case_round_trip() {
        let json = serde_json::to_value(RelaySettings::default()).unwrap();
        assert_eq!(json["server"]["sendQueueCapacity"], 256);
        assert_eq!(json["rateLimit"]["maxRequests"], 600);
        assert_eq!(json["logging"]["format"], "pretty");
        assert!(json["auth"].get("apiKey").is_none());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: RelaySettings =
            serde_json::from_str(r#"{"server": {"port": 8080}, "logging": {"format": "json"}}"#)
                .unwrap();
        assert_eq!(s.server.port, 8080);
        assert_eq!(s.server.host, "0.0.0.0");
        assert_eq!(s.logging.format, LogFormat::Json);
        assert_eq!(s.logging.level, "info");
    }
}
