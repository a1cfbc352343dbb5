use std::sync::Arc;
use tokio::sync::mpsc;

use crate::bus::BusCommand;
use crate::db::DbPool;
use crate::events::HistoryStore;
use crate::sse::ConnectionRegistry;

/// Shared application state passed to all handlers via axum State extractor.
/// Constructed once at startup — no ambient globals.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection wrapped in Arc<Mutex>, backing history persistence
    pub db: DbPool,
    /// Latest-frame-per-key store replayed to new viewer connections
    pub history: Arc<HistoryStore>,
    /// Active SSE viewer connections
    pub connections: ConnectionRegistry,
    /// Channel for handing frames to the bus loop
    pub bus_tx: mpsc::UnboundedSender<BusCommand>,
    /// Shared-secret producer/viewer token; None disables the check
    pub auth_token: Option<String>,
}
