//! Registry of open socket connections.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::{counter, gauge};
use parking_lot::RwLock;
use scope_core::ConnectionId;
use tracing::debug;

use super::connection::ClientConnection;
use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL};

/// Every currently open connection, keyed by id.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Arc<ClientConnection>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection.
    pub fn register(&self, connection: Arc<ClientConnection>) {
        let role = connection.role.as_str();
        let count = {
            let mut map = self.connections.write();
            let _ = map.insert(connection.id.clone(), connection);
            map.len()
        };
        counter!(WS_CONNECTIONS_TOTAL, "role" => role).increment(1);
        record_active(count);
    }

    /// Add a connection and return a guard that unregisters it on drop.
    pub fn register_guarded(self: &Arc<Self>, connection: Arc<ClientConnection>) -> Registration {
        let id = connection.id.clone();
        self.register(connection);
        Registration {
            registry: Arc::clone(self),
            id,
        }
    }

    /// Remove a connection and mark it closed.
    pub fn unregister(&self, id: &ConnectionId) -> Option<Arc<ClientConnection>> {
        let (removed, count) = {
            let mut map = self.connections.write();
            let removed = map.remove(id);
            (removed, map.len())
        };
        if let Some(conn) = &removed {
            conn.close();
            counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
            record_active(count);
            debug!(conn_id = %id, remaining = count, "connection unregistered");
        }
        removed
    }

    /// Call `f` for every open connection except `origin`.
    ///
    /// Iterates a snapshot, so `f` runs without the registry lock held.
    /// Returns how many connections `f` was called for.
    pub fn for_each_other<F>(&self, origin: Option<&ConnectionId>, mut f: F) -> usize
    where
        F: FnMut(&ClientConnection),
    {
        let snapshot: Vec<Arc<ClientConnection>> =
            self.connections.read().values().cloned().collect();
        let mut visited = 0;
        for conn in snapshot {
            if origin == Some(&conn.id) || !conn.is_open() {
                continue;
            }
            f(&conn);
            visited += 1;
        }
        visited
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    /// Whether no connections are registered.
    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }
}

/// Keeps a connection registered for as long as it lives.
///
/// Dropping it (normal close, error, timeout, shutdown or unwind)
/// unregisters the connection.
pub struct Registration {
    registry: Arc<ConnectionRegistry>,
    id: ConnectionId,
}

impl Registration {
    /// Id of the registered connection.
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        let _ = self.registry.unregister(&self.id);
    }
}

#[allow(clippy::cast_precision_loss)]
fn record_active(count: usize) {
    gauge!(WS_CONNECTIONS_ACTIVE).set(count as f64);
}
