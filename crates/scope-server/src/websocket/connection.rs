//! Socket connection state.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use axum::extract::ws::Utf8Bytes;
use scope_core::ConnectionId;
use tokio::sync::mpsc;

/// Which transport a connection arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionRole {
    /// Viewer on the event stream (`/ws`). Receives, never relays.
    Viewer,
    /// Raw relay peer (`/`). Its JSON frames are forwarded to everyone else.
    Peer,
}

impl ConnectionRole {
    /// Label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Peer => "peer",
        }
    }
}

impl fmt::Display for ConnectionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One open socket.
///
/// Open → Closed is a single transition; a closed connection never
/// reopens and is never a delivery target again.
pub struct ClientConnection {
    /// Unique connection id.
    pub id: ConnectionId,
    /// Transport the connection arrived on.
    pub role: ConnectionRole,
    /// Send channel to the connection's writer task.
    tx: mpsc::Sender<Utf8Bytes>,
    /// When the connection was accepted.
    pub connected_at: Instant,
    open: AtomicBool,
    /// Set by any inbound traffic, cleared by each heartbeat check.
    is_alive: AtomicBool,
    dropped_messages: AtomicU64,
}

impl ClientConnection {
    /// Create an open connection.
    pub fn new(id: ConnectionId, role: ConnectionRole, tx: mpsc::Sender<Utf8Bytes>) -> Self {
        Self {
            id,
            role,
            tx,
            connected_at: Instant::now(),
            open: AtomicBool::new(true),
            is_alive: AtomicBool::new(true),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Whether the transport can still take messages.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) && !self.tx.is_closed()
    }

    /// Mark the connection closed. Idempotent.
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }

    /// Queue a message for the writer task without waiting.
    ///
    /// Returns `false` (and counts a drop) when the connection is closed or
    /// its buffer is full.
    pub fn send(&self, message: Utf8Bytes) -> bool {
        if self.open.load(Ordering::Acquire) && self.tx.try_send(message).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Messages dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Record inbound traffic (pong or frame).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
    }

    /// Read and clear the alive flag.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
