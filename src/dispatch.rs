//! The dispatcher glues the core together: a submission updates history,
//! goes out on the bus, and a per-process subscriber loop pushes every bus
//! frame to the local viewer connections.

use serde_json::Value;
use tokio::sync::mpsc;

use crate::bus::{BusCommand, BusEvent};
use crate::db;
use crate::events::{format_frame, frame::stamp_event, DASHBOARD_TARGET};
use crate::sse::{broadcast, ConnectionRegistry};
use crate::state::AppState;

/// Accept a submitted event: stamp `id` and `updatedAt`, format the wire
/// frame (tagged with `target` as the event name when present), record it in
/// history, and publish it on the bus. Returns the formatted frame.
///
/// Dashboard-targeted events are broadcast live but skip history — they are
/// navigation events, not widget state.
///
/// History policy: the in-memory upsert (atomic with snapshot recomputation)
/// is authoritative; the SQLite write-through runs on a blocking task and a
/// failure there is logged without disturbing the submission or the live
/// broadcast.
pub fn submit(state: &AppState, key: &str, mut body: Value, target: Option<&str>) -> String {
    stamp_event(key, &mut body);
    let frame = format_frame(&body.to_string(), target);

    if target != Some(DASHBOARD_TARGET) {
        state.history.upsert(key, &frame);

        let db = state.db.clone();
        let key = key.to_string();
        let persisted = frame.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = db::persist_entry(&db, &key, &persisted) {
                tracing::warn!(key = %key, error = %e, "Failed to persist history entry");
            }
        });
    }

    // Fire-and-forget: delivery is best-effort, the submission path never
    // fails because the mesh is unavailable.
    if state
        .bus_tx
        .send(BusCommand::Publish {
            data: frame.clone().into_bytes(),
        })
        .is_err()
    {
        tracing::error!("Bus loop is gone, event not broadcast");
    }

    frame
}

/// Per-process subscriber loop: forward every frame the bus delivers (own
/// publishes and peers' alike) to all registered viewer connections. Runs
/// until the bus loop drops its event sender.
pub async fn run_subscriber(
    mut evt_rx: mpsc::UnboundedReceiver<BusEvent>,
    registry: ConnectionRegistry,
) {
    while let Some(event) = evt_rx.recv().await {
        match event {
            BusEvent::Frame(data) => match String::from_utf8(data) {
                Ok(frame) => broadcast::push_to_all(&registry, &frame),
                Err(e) => tracing::warn!(error = %e, "Dropping non-UTF-8 bus frame"),
            },
        }
    }
    tracing::info!("Bus event channel closed, subscriber loop exiting");
}
