//! Tests for the connection registry push loop and the dispatcher:
//! concurrent membership changes, delivery guarantees, history interplay.

use std::sync::Arc;
use std::time::Duration;
use serde_json::json;
use tokio::sync::mpsc;
use uuid::Uuid;

use pulseboard_server::bus;
use pulseboard_server::dispatch;
use pulseboard_server::events::{HistoryStore, DASHBOARD_TARGET};
use pulseboard_server::sse::{self, broadcast, ConnectionRegistry};
use pulseboard_server::state::AppState;

/// Build an AppState wired to a loopback bus and a running subscriber loop,
/// with a throwaway database.
fn test_state(tmp_dir: &tempfile::TempDir) -> AppState {
    let data_dir = tmp_dir.path().to_str().unwrap().to_string();
    let db = pulseboard_server::db::init_db(&data_dir).expect("Failed to init DB");

    let connections = sse::new_connection_registry();
    let (bus_cmd_tx, bus_cmd_rx) = mpsc::unbounded_channel();
    let (bus_evt_tx, bus_evt_rx) = mpsc::unbounded_channel();
    tokio::spawn(bus::run_loopback_loop(bus_cmd_rx, bus_evt_tx));
    tokio::spawn(dispatch::run_subscriber(bus_evt_rx, connections.clone()));

    AppState {
        db,
        history: Arc::new(HistoryStore::new()),
        connections,
        bus_tx: bus_cmd_tx,
        auth_token: None,
    }
}

/// Register a test viewer and return its receiving end.
fn add_viewer(registry: &ConnectionRegistry) -> (Uuid, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let id = Uuid::new_v4();
    registry.insert(id, tx);
    (id, rx)
}

async fn recv_frame(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("Timed out waiting for frame")
        .expect("Connection channel closed unexpectedly")
}

async fn expect_silence(rx: &mut mpsc::UnboundedReceiver<String>) {
    let result = tokio::time::timeout(Duration::from_millis(300), rx.recv()).await;
    assert!(result.is_err(), "Expected no frame, got {:?}", result);
}

#[tokio::test]
async fn push_delivers_exactly_one_copy_per_connection() {
    let registry = sse::new_connection_registry();
    let mut viewers: Vec<_> = (0..5).map(|_| add_viewer(&registry).1).collect();

    broadcast::push_to_all(&registry, "data: {\"id\":\"x\"}\n\n");

    for rx in &mut viewers {
        assert_eq!(recv_frame(rx).await, "data: {\"id\":\"x\"}\n\n");
        expect_silence(rx).await;
    }
}

#[tokio::test]
async fn closed_connection_is_dropped_without_affecting_others() {
    let registry = sse::new_connection_registry();
    let (_id_a, mut rx_a) = add_viewer(&registry);
    let (_id_b, rx_b) = add_viewer(&registry);

    // Simulate a disconnected client: its receiving end is gone
    drop(rx_b);

    broadcast::push_to_all(&registry, "data: one\n\n");
    assert_eq!(recv_frame(&mut rx_a).await, "data: one\n\n");
    assert_eq!(registry.len(), 1, "Closed connection should have been removed");

    // The surviving connection keeps receiving
    broadcast::push_to_all(&registry, "data: two\n\n");
    assert_eq!(recv_frame(&mut rx_a).await, "data: two\n\n");
}

#[tokio::test]
async fn concurrent_add_remove_push_never_corrupts_a_frame() {
    let registry = sse::new_connection_registry();
    let frame = format!("data: {{\"id\":\"stress\",\"pad\":\"{}\"}}\n\n", "x".repeat(512));

    // Steady viewers that stay registered for the whole run
    let mut steady: Vec<_> = (0..4).map(|_| add_viewer(&registry).1).collect();

    let pushers: Vec<_> = (0..4)
        .map(|_| {
            let registry = registry.clone();
            let frame = frame.clone();
            tokio::spawn(async move {
                for _ in 0..100 {
                    broadcast::push_to_all(&registry, &frame);
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    let churners: Vec<_> = (0..4)
        .map(|_| {
            let registry = registry.clone();
            tokio::spawn(async move {
                for _ in 0..100 {
                    let (id, rx) = {
                        let (tx, rx) = mpsc::unbounded_channel::<String>();
                        let id = Uuid::new_v4();
                        registry.insert(id, tx);
                        (id, rx)
                    };
                    tokio::task::yield_now().await;
                    registry.remove(&id);
                    drop(rx);
                }
            })
        })
        .collect();

    for handle in pushers.into_iter().chain(churners) {
        handle.await.expect("Registry stress task panicked");
    }

    // Every steady viewer got 400 whole frames, nothing truncated
    for rx in &mut steady {
        for _ in 0..400 {
            assert_eq!(recv_frame(rx).await, frame);
        }
        expect_silence(rx).await;
    }
}

#[tokio::test]
async fn submit_updates_history_and_reaches_viewers() {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let state = test_state(&tmp_dir);
    let (_id, mut rx) = add_viewer(&state.connections);

    let frame = dispatch::submit(&state, "temp", json!({"value": 42}), None);
    assert!(frame.starts_with("data: {"));
    assert!(frame.contains("\"id\":\"temp\""));
    assert!(frame.contains("\"value\":42"));
    assert!(frame.ends_with("\n\n"));

    // History holds the frame and the snapshot replays it
    assert_eq!(state.history.get("temp"), Some(frame.clone()));
    assert_eq!(state.history.snapshot(), frame);

    // The live path delivers the identical bytes
    assert_eq!(recv_frame(&mut rx).await, frame);
}

#[tokio::test]
async fn dashboard_events_are_broadcast_but_not_recorded() {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let state = test_state(&tmp_dir);
    let (_id, mut rx) = add_viewer(&state.connections);

    let frame = dispatch::submit(&state, "main", json!({"event": "reload"}), Some(DASHBOARD_TARGET));
    assert!(frame.starts_with("event: dashboards\ndata: {"));

    assert_eq!(recv_frame(&mut rx).await, frame);
    assert!(state.history.is_empty(), "Dashboard events must not enter history");
    assert_eq!(state.history.get("main"), None);
}

#[tokio::test]
async fn resubmission_is_last_write_wins_but_both_go_live() {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let state = test_state(&tmp_dir);
    let (_id, mut rx) = add_viewer(&state.connections);

    let first = dispatch::submit(&state, "temp", json!({"value": 1}), None);
    let second = dispatch::submit(&state, "temp", json!({"value": 2}), None);

    // Live broadcast shows both, in submission order
    assert_eq!(recv_frame(&mut rx).await, first);
    assert_eq!(recv_frame(&mut rx).await, second);

    // History reflects only the second
    assert_eq!(state.history.get("temp"), Some(second.clone()));
    assert_eq!(state.history.snapshot(), second);
}

#[tokio::test]
async fn close_all_terminates_every_viewer_stream() {
    let registry = sse::new_connection_registry();
    let (_a, mut rx_a) = add_viewer(&registry);
    let (_b, mut rx_b) = add_viewer(&registry);

    broadcast::close_all(&registry);
    assert_eq!(registry.len(), 0);
    assert_eq!(rx_a.recv().await, None, "Stream should end, not hang");
    assert_eq!(rx_b.recv().await, None, "Stream should end, not hang");
}
