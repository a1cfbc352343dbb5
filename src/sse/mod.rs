pub mod broadcast;
pub mod handler;

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Sender half of a viewer connection's frame channel. The receiving half is
/// consumed by the connection's own response body stream, so all writes to
/// one viewer are serialized by construction — frames can never interleave
/// on a single stream.
pub type ConnectionSender = mpsc::UnboundedSender<String>;

/// Connection registry: every open viewer stream, keyed by connection id.
/// Membership changes and push iteration run concurrently without any
/// caller-side locking.
pub type ConnectionRegistry = Arc<DashMap<Uuid, ConnectionSender>>;

/// Create a new empty connection registry.
pub fn new_connection_registry() -> ConnectionRegistry {
    Arc::new(DashMap::new())
}

/// Removes a connection from the registry when its response stream is
/// dropped (client disconnect or server shutdown).
pub struct ConnectionGuard {
    id: Uuid,
    registry: ConnectionRegistry,
}

impl ConnectionGuard {
    pub fn new(id: Uuid, registry: ConnectionRegistry) -> Self {
        Self { id, registry }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.id);
        tracing::debug!(connection_id = %self.id, "Viewer connection unregistered");
    }
}
