//! Prometheus metrics recorder and metric names.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the handle used to render `/metrics`. Call once at startup,
/// before any metrics are recorded.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

// Metric name constants to avoid typos across modules.

/// Socket connections opened (counter, labels: role).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// Socket connections closed (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Open socket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Connections closed for missing heartbeats (counter).
pub const WS_HEARTBEAT_TIMEOUTS_TOTAL: &str = "ws_heartbeat_timeouts_total";
/// Socket frames dropped as malformed (counter).
pub const WS_MALFORMED_FRAMES_TOTAL: &str = "ws_malformed_frames_total";
/// Broadcasts dispatched (counter, labels: kind).
pub const BROADCASTS_TOTAL: &str = "broadcasts_total";
/// Messages handed to connection buffers (counter).
pub const BROADCAST_DELIVERIES_TOTAL: &str = "broadcast_deliveries_total";
/// Messages dropped for full or closed buffers (counter).
pub const BROADCAST_DROPS_TOTAL: &str = "broadcast_drops_total";
/// Ingestion requests (counter, labels: route).
pub const INGEST_REQUESTS_TOTAL: &str = "ingest_requests_total";
/// Ingestion requests rejected by validation (counter, labels: route).
pub const INGEST_REJECTIONS_TOTAL: &str = "ingest_rejections_total";
/// Requests rejected for a bad API key (counter).
pub const AUTH_REJECTIONS_TOTAL: &str = "auth_rejections_total";
/// Requests rejected by the rate limiter (counter).
pub const RATE_LIMITED_TOTAL: &str = "rate_limited_total";
/// Image uploads (counter, labels: outcome).
pub const UPLOADS_TOTAL: &str = "uploads_total";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_from_local_recorder() {
        // Build a recorder + handle without installing it globally.
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let output = handle.render();
        assert!(output.is_empty() || output.contains('#') || output.contains('\n'));
    }

    #[test]
    fn metric_constants_are_snake_case() {
        let names = [
            WS_CONNECTIONS_TOTAL,
            WS_DISCONNECTIONS_TOTAL,
            WS_CONNECTIONS_ACTIVE,
            WS_HEARTBEAT_TIMEOUTS_TOTAL,
            WS_MALFORMED_FRAMES_TOTAL,
            BROADCASTS_TOTAL,
            BROADCAST_DELIVERIES_TOTAL,
            BROADCAST_DROPS_TOTAL,
            INGEST_REQUESTS_TOTAL,
            INGEST_REJECTIONS_TOTAL,
            AUTH_REJECTIONS_TOTAL,
            RATE_LIMITED_TOTAL,
            UPLOADS_TOTAL,
        ];
        for name in names {
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "metric name '{name}' must be snake_case"
            );
        }
    }
}
