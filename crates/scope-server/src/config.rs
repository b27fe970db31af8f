//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use scope_settings::RelaySettings;

/// Sliding-window limit applied to guarded HTTP routes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests allowed per window per client.
    pub max_requests: usize,
    /// Window length.
    pub window: Duration,
    /// Identify clients by the first `X-Forwarded-For` address.
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 600,
            window: Duration::from_secs(60),
            trust_forwarded_for: false,
        }
    }
}

/// Configuration for the relay server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Max socket frame size in bytes.
    pub max_message_size: usize,
    /// Outbound buffer per connection, in messages.
    pub send_queue_capacity: usize,
    /// Interval between heartbeat pings.
    pub heartbeat_interval: Duration,
    /// Close a connection after this long without a pong.
    pub heartbeat_timeout: Duration,
    /// Serve the raw relay socket on `/`.
    pub socket_relay: bool,
    /// Shared key required on guarded routes. `None` disables the check.
    pub api_key: Option<String>,
    /// Rate limit on guarded routes. `None` disables it.
    pub rate_limit: Option<RateLimitConfig>,
    /// Images returned by `GET /api/images`.
    pub image_list_limit: usize,
    /// Largest accepted upload in bytes.
    pub max_upload_bytes: usize,
    /// Directory uploads are spooled to (system temp dir when `None`).
    pub spool_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            max_message_size: 64 * 1024,
            send_queue_capacity: 256,
            heartbeat_interval: Duration::from_secs(30),
            heartbeat_timeout: Duration::from_secs(90),
            socket_relay: true,
            api_key: None,
            rate_limit: None,
            image_list_limit: 10,
            max_upload_bytes: 10 * 1024 * 1024,
            spool_dir: None,
        }
    }
}

impl ServerConfig {
    /// Bind address as `host:port`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl From<&RelaySettings> for ServerConfig {
    fn from(settings: &RelaySettings) -> Self {
        let server = &settings.server;
        let rate_limit = settings.rate_limit_active().then(|| RateLimitConfig {
            max_requests: settings.rate_limit.max_requests,
            window: Duration::from_secs(settings.rate_limit.window_secs),
            trust_forwarded_for: settings.rate_limit.trust_forwarded_for,
        });
        let api_key = if settings.auth.enabled {
            settings.auth.api_key.clone()
        } else {
            None
        };
        Self {
            host: server.host.clone(),
            port: server.port,
            max_message_size: server.max_message_size,
            send_queue_capacity: server.send_queue_capacity,
            heartbeat_interval: Duration::from_secs(server.heartbeat_interval_secs),
            heartbeat_timeout: Duration::from_secs(server.heartbeat_timeout_secs),
            socket_relay: server.socket_relay,
            api_key,
            rate_limit,
            image_list_limit: settings.media.list_limit,
            max_upload_bytes: settings.media.max_upload_bytes,
            spool_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_binds_loopback_on_ephemeral_port() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.bind_addr(), "127.0.0.1:0");
    }

    #[test]
    fn default_guards_disabled() {
        let cfg = ServerConfig::default();
        assert!(cfg.api_key.is_none());
        assert!(cfg.rate_limit.is_none());
        assert!(cfg.socket_relay);
    }

    #[test]
    fn default_rate_limit_quota() {
        let rl = RateLimitConfig::default();
        assert_eq!(rl.max_requests, 600);
        assert_eq!(rl.window, Duration::from_secs(60));
    }

    #[test]
    fn from_default_settings() {
        let cfg = ServerConfig::from(&RelaySettings::default());
        assert_eq!(cfg.bind_addr(), "0.0.0.0:3000");
        assert_eq!(cfg.heartbeat_timeout, Duration::from_secs(90));
        assert_eq!(cfg.image_list_limit, 10);
        assert!(cfg.api_key.is_none());
        assert!(cfg.rate_limit.is_none());
    }

    #[test]
    fn api_key_only_applied_when_auth_enabled() {
        let mut settings = RelaySettings::default();
        settings.auth.api_key = Some("k".into());
        assert!(ServerConfig::from(&settings).api_key.is_none());
        settings.auth.enabled = true;
        assert_eq!(ServerConfig::from(&settings).api_key.as_deref(), Some("k"));
    }

    #[test]
    fn rate_limit_mapped_when_enabled() {
        let mut settings = RelaySettings::default();
        settings.rate_limit.enabled = true;
        settings.rate_limit.max_requests = 5;
        settings.rate_limit.window_secs = 10;
        let rl = ServerConfig::from(&settings).rate_limit.unwrap();
        assert_eq!(rl.max_requests, 5);
        assert_eq!(rl.window, Duration::from_secs(10));
        assert!(!rl.trust_forwarded_for);
    }

    #[test]
    fn auth_brings_default_rate_limit() {
        let mut settings = RelaySettings::default();
        settings.auth.enabled = true;
        settings.auth.api_key = Some("k".into());
        let cfg = ServerConfig::from(&settings);
        assert_eq!(cfg.api_key.as_deref(), Some("k"));
        let rl = cfg.rate_limit.unwrap();
        assert_eq!(rl.max_requests, 600);
        assert_eq!(rl.window, Duration::from_secs(60));
    }
}
