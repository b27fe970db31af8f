//! Per-client sliding-window rate limit.
//!
//! Each client keeps the timestamps of its requests inside the current
//! window. A request is admitted while fewer than `max_requests` remain in
//! the window. Rejected requests are not recorded.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use dashmap::DashMap;
use metrics::counter;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::RateLimitConfig;
use crate::errors::ApiError;
use crate::metrics::RATE_LIMITED_TOTAL;
use crate::server::AppState;

/// Sliding-window request counter keyed by client address.
pub struct SlidingWindowLimiter {
    max_requests: usize,
    window: Duration,
    trust_forwarded_for: bool,
    clients: DashMap<String, VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    /// Create a limiter from config.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window: config.window,
            trust_forwarded_for: config.trust_forwarded_for,
            clients: DashMap::new(),
        }
    }

    /// Admit or reject a request from `client` now.
    pub fn check(&self, client: &str) -> Result<(), Duration> {
        self.check_at(client, Instant::now())
    }

    /// Admit or reject a request from `client` at `now`.
    ///
    /// On rejection returns how long until the oldest request in the window
    /// expires.
    pub fn check_at(&self, client: &str, now: Instant) -> Result<(), Duration> {
        let mut hits = self.clients.entry(client.to_owned()).or_default();
        while hits
            .front()
            .is_some_and(|&t| now.saturating_duration_since(t) >= self.window)
        {
            let _ = hits.pop_front();
        }
        if hits.len() >= self.max_requests {
            let oldest = hits.front().copied().unwrap_or(now);
            return Err((oldest + self.window).saturating_duration_since(now));
        }
        hits.push_back(now);
        Ok(())
    }

    /// Forget clients with no requests left in the window.
    pub fn prune_at(&self, now: Instant) {
        self.clients.retain(|_, hits| {
            hits.back()
                .is_some_and(|&t| now.saturating_duration_since(t) < self.window)
        });
    }

    /// Clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }

    /// Client key for a request: the peer address, or the first
    /// `X-Forwarded-For` entry when configured to trust it.
    pub fn client_key(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
        if self.trust_forwarded_for {
            let forwarded = headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            if let Some(addr) = forwarded {
                return addr.to_owned();
            }
        }
        peer.map_or_else(|| "unknown".to_owned(), |addr| addr.ip().to_string())
    }
}

/// Periodically drop idle clients until `cancel` fires.
pub fn spawn_pruner(
    limiter: Arc<SlidingWindowLimiter>,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        let _ = ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    limiter.prune_at(Instant::now());
                    debug!(clients = limiter.tracked_clients(), "pruned rate limiter");
                }
                () = cancel.cancelled() => break,
            }
        }
    })
}

/// Middleware for guarded routes. Runs before the API key check.
pub async fn enforce_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(limiter) = state.limiter.as_deref() else {
        return Ok(next.run(request).await);
    };
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = limiter.client_key(request.headers(), peer);
    if let Err(wait) = limiter.check(&client) {
        let retry_after_secs = retry_after_secs(wait);
        counter!(RATE_LIMITED_TOTAL).increment(1);
        warn!(client = %client, retry_after_secs, "rate limit exceeded");
        return Err(ApiError::RateLimited { retry_after_secs });
    }
    Ok(next.run(request).await)
}

/// Whole seconds to wait, rounded up, never less than one.
fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn limiter(max: usize, window_secs: u64) -> SlidingWindowLimiter {
        SlidingWindowLimiter::new(&RateLimitConfig {
            max_requests: max,
            window: Duration::from_secs(window_secs),
            trust_forwarded_for: false,
        })
    }

    #[test]
    fn admits_up_to_quota_then_rejects() {
        let limiter = limiter(600, 60);
        let now = Instant::now();
        for _ in 0..600 {
            assert!(limiter.check_at("1.2.3.4", now).is_ok());
        }
        let wait = limiter.check_at("1.2.3.4", now).unwrap_err();
        assert_eq!(wait, Duration::from_secs(60));
    }

    #[test]
    fn window_slides() {
        let limiter = limiter(2, 10);
        let start = Instant::now();
        limiter.check_at("c", start).unwrap();
        limiter.check_at("c", start + Duration::from_secs(4)).unwrap();

        let wait = limiter
            .check_at("c", start + Duration::from_secs(6))
            .unwrap_err();
        assert_eq!(wait, Duration::from_secs(4));

        assert!(limiter.check_at("c", start + Duration::from_secs(10)).is_ok());
    }

    #[test]
    fn clients_are_independent() {
        let limiter = limiter(1, 60);
        let now = Instant::now();
        assert!(limiter.check_at("a", now).is_ok());
        assert!(limiter.check_at("a", now).is_err());
        assert!(limiter.check_at("b", now).is_ok());
    }

    #[test]
    fn rejected_requests_do_not_extend_the_window() {
        let limiter = limiter(1, 10);
        let start = Instant::now();
        limiter.check_at("c", start).unwrap();
        for s in 1..10 {
            assert!(limiter.check_at("c", start + Duration::from_secs(s)).is_err());
        }
        assert!(limiter.check_at("c", start + Duration::from_secs(10)).is_ok());
    }

    #[test]
    fn prune_forgets_idle_clients() {
        let limiter = limiter(5, 10);
        let start = Instant::now();
        limiter.check_at("old", start).unwrap();
        limiter.check_at("fresh", start + Duration::from_secs(8)).unwrap();
        limiter.prune_at(start + Duration::from_secs(12));
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn retry_after_rounds_up() {
        assert_eq!(retry_after_secs(Duration::from_millis(1)), 1);
        assert_eq!(retry_after_secs(Duration::ZERO), 1);
        assert_eq!(retry_after_secs(Duration::from_millis(4_200)), 5);
        assert_eq!(retry_after_secs(Duration::from_secs(60)), 60);
    }

    #[test]
    fn client_key_uses_peer_ip() {
        let limiter = limiter(1, 1);
        let peer: SocketAddr = "10.0.0.7:51234".parse().unwrap();
        let mut headers = HeaderMap::new();
        let _ = headers.insert("x-forwarded-for", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(limiter.client_key(&headers, Some(peer)), "10.0.0.7");
        assert_eq!(limiter.client_key(&HeaderMap::new(), None), "unknown");
    }

    #[test]
    fn client_key_trusts_forwarded_for_when_configured() {
        let limiter = SlidingWindowLimiter::new(&RateLimitConfig {
            trust_forwarded_for: true,
            ..RateLimitConfig::default()
        });
        let peer: SocketAddr = "10.0.0.7:51234".parse().unwrap();
        let mut headers = HeaderMap::new();
        let _ = headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.5, 10.0.0.1"),
        );
        assert_eq!(limiter.client_key(&headers, Some(peer)), "203.0.113.5");
        assert_eq!(limiter.client_key(&HeaderMap::new(), Some(peer)), "10.0.0.7");
    }

    #[tokio::test(start_paused = true)]
    async fn pruner_stops_on_cancel() {
        let limiter = Arc::new(limiter(1, 1));
        let cancel = CancellationToken::new();
        let handle = spawn_pruner(Arc::clone(&limiter), Duration::from_secs(5), cancel.clone());
        cancel.cancel();
        handle.await.unwrap();
    }
}
