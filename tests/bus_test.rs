//! Cross-process bus tests: two swarm nodes on localhost exchanging frames.

use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use pulseboard_server::bus::{self, BusCommand, BusConfig, BusEvent};

/// Grab a free localhost port by binding port 0 and releasing it.
async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

/// Start a swarm-backed bus node and return its command/event channel ends.
async fn start_bus_node(
    data_dir: &str,
    config: BusConfig,
) -> (
    mpsc::UnboundedSender<BusCommand>,
    mpsc::UnboundedReceiver<BusEvent>,
) {
    let keypair = bus::identity::bus_identity_keypair(data_dir);
    let swarm = bus::swarm::build_swarm(keypair, &config).await;

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (evt_tx, evt_rx) = mpsc::unbounded_channel();
    tokio::spawn(bus::swarm::run_bus_loop(swarm, config, cmd_rx, evt_tx));

    (cmd_tx, evt_rx)
}

fn publish(cmd_tx: &mpsc::UnboundedSender<BusCommand>, frame: &str) {
    cmd_tx
        .send(BusCommand::Publish {
            data: frame.as_bytes().to_vec(),
        })
        .expect("Bus loop should be running");
}

async fn recv_frame(evt_rx: &mut mpsc::UnboundedReceiver<BusEvent>, wait: Duration) -> Option<String> {
    match tokio::time::timeout(wait, evt_rx.recv()).await {
        Ok(Some(BusEvent::Frame(data))) => {
            Some(String::from_utf8(data).expect("Bus frame was not UTF-8"))
        }
        Ok(None) => panic!("Bus event channel closed unexpectedly"),
        Err(_) => None,
    }
}

#[tokio::test]
async fn identical_frames_are_each_delivered_to_peers() {
    let tmp_a = tempfile::tempdir().expect("Failed to create temp dir");
    let tmp_b = tempfile::tempdir().expect("Failed to create temp dir");
    let port_a = free_port().await;
    let port_b = free_port().await;

    let topic = format!("test/events-{}", port_a);
    let config_a = BusConfig {
        libp2p_port: port_a,
        topic: topic.clone(),
        peers: vec![format!("/ip4/127.0.0.1/tcp/{}/ws", port_b)],
        redial_interval_secs: 1,
        ..Default::default()
    };
    let config_b = BusConfig {
        libp2p_port: port_b,
        topic,
        ..Default::default()
    };

    let (cmd_a, mut evt_a) = start_bus_node(tmp_a.path().to_str().unwrap(), config_a).await;
    let (_cmd_b, mut evt_b) = start_bus_node(tmp_b.path().to_str().unwrap(), config_b).await;

    // Wait for the nodes to mesh: keep publishing distinct warmup frames
    // from A until one crosses over to B.
    let mut meshed = false;
    for i in 0..40 {
        publish(&cmd_a, &format!("data: {{\"warmup\":{}}}\n\n", i));
        if recv_frame(&mut evt_b, Duration::from_millis(500)).await.is_some() {
            meshed = true;
            break;
        }
    }
    assert!(meshed, "Bus nodes never exchanged a frame");

    // Drain stragglers from the warmup burst on both sides
    while recv_frame(&mut evt_b, Duration::from_millis(700)).await.is_some() {}
    while recv_frame(&mut evt_a, Duration::from_millis(100)).await.is_some() {}

    // Resubmitting an identical event produces a byte-identical frame.
    // Every copy must reach the peer — remote viewers see both, same as
    // local ones.
    let frame = "data: {\"id\":\"temp\",\"updatedAt\":1234,\"value\":42}\n\n";
    publish(&cmd_a, frame);
    publish(&cmd_a, frame);

    let first = recv_frame(&mut evt_b, Duration::from_secs(5)).await;
    assert_eq!(first.as_deref(), Some(frame));
    let second = recv_frame(&mut evt_b, Duration::from_secs(5)).await;
    assert_eq!(
        second.as_deref(),
        Some(frame),
        "Peer dropped the second identical frame instead of delivering it"
    );

    // The publisher's own loopback also saw both copies
    assert_eq!(recv_frame(&mut evt_a, Duration::from_secs(1)).await.as_deref(), Some(frame));
    assert_eq!(recv_frame(&mut evt_a, Duration::from_secs(1)).await.as_deref(), Some(frame));
}
