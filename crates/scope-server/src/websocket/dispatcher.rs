//! Broadcast fan-out.
//!
//! Each message is serialized once and handed to every open connection's
//! buffer without waiting. A full or closed buffer drops the message for
//! that connection only; the sender is never told.

use std::sync::Arc;

use axum::extract::ws::Utf8Bytes;
use metrics::counter;
use scope_core::{ConnectionId, OutboundMessage, RelayEvent, RelayFrame};
use tracing::{debug, warn};

use super::registry::ConnectionRegistry;
use crate::metrics::{BROADCAST_DELIVERIES_TOTAL, BROADCAST_DROPS_TOTAL, BROADCASTS_TOTAL};

/// Outcome of one broadcast, for logs and metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Connections the message was queued for.
    pub recipients: usize,
    /// Connections whose buffer rejected it.
    pub dropped: usize,
}

/// Fans messages out to registered connections.
pub struct BroadcastDispatcher {
    registry: Arc<ConnectionRegistry>,
}

impl BroadcastDispatcher {
    /// Create a dispatcher over `registry`.
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver `message` to every open connection except `origin`.
    pub fn dispatch(
        &self,
        message: &OutboundMessage,
        origin: Option<&ConnectionId>,
    ) -> DispatchReport {
        let wire = match message.to_wire() {
            Ok(wire) => Utf8Bytes::from(wire),
            Err(e) => {
                warn!(kind = message.kind(), error = %e, "failed to serialize broadcast");
                return DispatchReport::default();
            }
        };

        let mut report = DispatchReport::default();
        let _ = self.registry.for_each_other(origin, |conn| {
            if conn.send(wire.clone()) {
                report.recipients += 1;
            } else {
                report.dropped += 1;
                warn!(
                    conn_id = %conn.id,
                    total_drops = conn.drop_count(),
                    "connection buffer full or closed, message dropped"
                );
            }
        });

        counter!(BROADCASTS_TOTAL, "kind" => message.kind()).increment(1);
        counter!(BROADCAST_DELIVERIES_TOTAL).increment(report.recipients as u64);
        if report.dropped > 0 {
            counter!(BROADCAST_DROPS_TOTAL).increment(report.dropped as u64);
        }
        debug!(
            kind = message.kind(),
            origin = origin.map(ConnectionId::as_str),
            recipients = report.recipients,
            dropped = report.dropped,
            "broadcast dispatched"
        );
        report
    }

    /// Broadcast an event from HTTP ingestion to every connection.
    pub fn broadcast_event(&self, event: RelayEvent) -> DispatchReport {
        self.dispatch(&OutboundMessage::Event(event), None)
    }

    /// Relay a peer's frame to every other connection.
    pub fn relay_frame(&self, frame: RelayFrame, origin: &ConnectionId) -> DispatchReport {
        self.dispatch(&OutboundMessage::Raw(frame), Some(origin))
    }
}
