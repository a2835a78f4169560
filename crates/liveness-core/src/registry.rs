//! The set of live connections.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::connection::Connection;
use crate::ids::ConnectionId;

/// Thread-safe set of registered connections, keyed by [`ConnectionId`].
///
/// One lock guards the whole map. Mutations are rare next to sweep reads, and
/// every operation is a short in-memory step, so a single lock keeps the
/// membership story simple without measurable contention.
///
/// Handles are held by `Arc`, so a snapshot taken for a sweep stays valid even
/// if the transport closes the connection mid-sweep; a late probe then fails
/// with [`TransportError::Closed`](crate::TransportError::Closed) instead of
/// touching freed state.
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Arc<dyn Connection>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a connection. Returns `true` if the ID was not yet present.
    ///
    /// Re-adding an existing ID replaces the handle in its slot.
    pub fn add(&self, connection: Arc<dyn Connection>) -> bool {
        let id = connection.id().clone();
        let mut conns = self.connections.write();
        let replaced = conns.insert(id.clone(), connection).is_some();
        debug!(conn_id = %id, replaced, total = conns.len(), "connection registered");
        !replaced
    }

    /// Unregister a connection. Removing an absent ID is a no-op.
    pub fn remove(&self, id: &ConnectionId) -> Option<Arc<dyn Connection>> {
        let mut conns = self.connections.write();
        let removed = conns.remove(id);
        if removed.is_some() {
            debug!(conn_id = %id, total = conns.len(), "connection unregistered");
        }
        removed
    }

    /// Copy of the current membership, taken under the lock.
    pub fn snapshot(&self) -> Vec<Arc<dyn Connection>> {
        self.connections.read().values().cloned().collect()
    }

    /// IDs of all registered connections.
    pub fn ids(&self) -> Vec<ConnectionId> {
        self.connections.read().keys().cloned().collect()
    }

    /// Look up a connection by ID.
    pub fn get(&self, id: &ConnectionId) -> Option<Arc<dyn Connection>> {
        self.connections.read().get(id).cloned()
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.read().contains_key(id)
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

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
