use axum::{
    body::{Body, Bytes},
    extract::{Query, State},
    http::{header, StatusCode},
    response::Response,
};
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

use crate::http::auth;
use crate::sse::ConnectionGuard;
use crate::state::AppState;

/// Query parameters for the event stream.
/// Auth is via query param since EventSource clients cannot set headers.
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub auth_token: Option<String>,
}

/// GET /events
/// Long-lived SSE stream. The viewer first receives the full history
/// snapshot (latest frame per key), then every live frame until it
/// disconnects or the server shuts down.
pub async fn events_stream(
    State(state): State<AppState>,
    Query(params): Query<EventsQuery>,
) -> Result<Response, (StatusCode, &'static str)> {
    if !auth::authenticated(state.auth_token.as_deref(), params.auth_token.as_deref()) {
        return Err((StatusCode::UNAUTHORIZED, "Invalid API key\n"));
    }

    let (tx, rx) = mpsc::unbounded_channel::<String>();
    let id = Uuid::new_v4();

    // Register first, then queue the replay snapshot. A push racing this
    // window can land ahead of the snapshot and also be reflected in it —
    // the boundary event is at-least-once, never lost.
    state.connections.insert(id, tx.clone());
    let snapshot = state.history.snapshot();
    if !snapshot.is_empty() {
        let _ = tx.send(snapshot);
    }

    tracing::debug!(
        connection_id = %id,
        connections = state.connections.len(),
        "Viewer connection registered"
    );

    // The guard lives inside the body stream: when the client disconnects
    // (or shutdown drops the stream), the registry entry goes with it.
    let guard = ConnectionGuard::new(id, state.connections.clone());
    let stream = UnboundedReceiverStream::new(rx).map(move |frame| {
        let _held = &guard;
        Ok::<Bytes, std::convert::Infallible>(Bytes::from(frame))
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        // Disable buffering for nginx
        .header("X-Accel-Buffering", "no")
        .body(Body::from_stream(stream))
        .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "Failed to open stream\n"))
}
