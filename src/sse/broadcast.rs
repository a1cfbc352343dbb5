use super::ConnectionRegistry;

/// Push a frame to every registered viewer connection.
///
/// Iterates the concurrent map directly — sends are non-blocking, so a slow
/// or stalled client never delays delivery to the others. A send that fails
/// means the receiver (the connection's body stream) is gone; that entry is
/// dropped on the spot and delivery continues to the rest.
pub fn push_to_all(registry: &ConnectionRegistry, frame: &str) {
    registry.retain(|id, sender| {
        if sender.send(frame.to_string()).is_ok() {
            true
        } else {
            tracing::debug!(connection_id = %id, "Dropping closed viewer connection");
            false
        }
    });
}

/// Close every registered connection. Dropping the senders ends each
/// viewer's body stream, so clients observe a clean stream termination
/// instead of a hang — used on process shutdown.
pub fn close_all(registry: &ConnectionRegistry) {
    let open = registry.len();
    registry.clear();
    if open > 0 {
        tracing::info!(connections = open, "Closed all viewer connections");
    }
}
