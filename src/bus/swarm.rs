use futures_util::StreamExt;
use libp2p::{gossipsub, identify, noise, yamux, Multiaddr, Swarm, SwarmBuilder};
use std::time::Duration;
use tokio::sync::mpsc;

use super::behaviour::{build_behaviour, BusBehaviour, BusBehaviourEvent};
use super::config::BusConfig;

/// Commands sent from the dispatcher to the bus loop.
pub enum BusCommand {
    /// Publish raw frame bytes on the event topic.
    Publish { data: Vec<u8> },
}

/// Events emitted from the bus loop to the per-process subscriber task.
pub enum BusEvent {
    /// A frame to deliver to every local viewer connection. Carries frames
    /// published by peer processes and this process's own publishes.
    Frame(Vec<u8>),
}

/// Build the libp2p Swarm with the bus behaviour.
pub async fn build_swarm(
    keypair: libp2p::identity::Keypair,
    config: &BusConfig,
) -> Swarm<BusBehaviour> {
    let config_clone = config.clone();

    SwarmBuilder::with_existing_identity(keypair)
        .with_tokio()
        .with_tcp(
            Default::default(),
            noise::Config::new,
            yamux::Config::default,
        )
        .expect("TCP transport")
        .with_websocket(noise::Config::new, yamux::Config::default)
        .await
        .expect("WebSocket transport")
        .with_behaviour(|key| build_behaviour(key, &config_clone))
        .expect("Behaviour")
        .build()
}

/// Run the bus event loop.
///
/// Spawned once per process as a tokio task. It owns the Swarm and processes:
/// - gossipsub messages from peer processes (forwarded as `BusEvent::Frame`)
/// - publish commands from the dispatcher
/// - a re-dial timer that keeps trying configured peers, so a peer outage is
///   survived by reconnecting in the background
///
/// Gossipsub does not deliver a node's own publishes back to it, so every
/// published frame is looped back onto the event channel before it is handed
/// to the mesh — the subscriber sees frames from every process, this one
/// included.
pub async fn run_bus_loop(
    mut swarm: Swarm<BusBehaviour>,
    config: BusConfig,
    mut cmd_rx: mpsc::UnboundedReceiver<BusCommand>,
    evt_tx: mpsc::UnboundedSender<BusEvent>,
) {
    let topic = gossipsub::IdentTopic::new(&config.topic);
    if let Err(e) = swarm.behaviour_mut().gossipsub.subscribe(&topic) {
        tracing::error!("Failed to subscribe to bus topic {}: {:?}", config.topic, e);
        return;
    }

    let listen_addr: Multiaddr = format!("/ip4/0.0.0.0/tcp/{}/ws", config.libp2p_port)
        .parse()
        .expect("Valid bus listen multiaddr");
    match swarm.listen_on(listen_addr.clone()) {
        Ok(_) => tracing::info!("Bus swarm listening on {}", listen_addr),
        Err(e) => {
            tracing::error!("Failed to listen on {}: {}", listen_addr, e);
            return;
        }
    }

    let peer_addrs: Vec<Multiaddr> = config
        .peers
        .iter()
        .filter_map(|addr| match addr.parse() {
            Ok(multiaddr) => Some(multiaddr),
            Err(e) => {
                tracing::error!("Invalid bus peer multiaddr {}: {}", addr, e);
                None
            }
        })
        .collect();
    dial_peers(&mut swarm, &peer_addrs);

    let mut redial_timer =
        tokio::time::interval(Duration::from_secs(config.redial_interval_secs.max(1)));
    // Skip the immediate first tick; startup already dialed.
    redial_timer.tick().await;

    loop {
        tokio::select! {
            event = swarm.select_next_some() => {
                handle_swarm_event(event, &evt_tx);
            }
            _ = redial_timer.tick() => {
                dial_peers(&mut swarm, &peer_addrs);
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(cmd) => handle_bus_command(&mut swarm, &topic, &evt_tx, cmd),
                    None => {
                        tracing::info!("Bus command channel closed, shutting down");
                        break;
                    }
                }
            }
        }
    }
}

/// Dial the configured peers. Already-connected peers fail the dial
/// harmlessly; disconnected ones get a fresh attempt each timer tick.
fn dial_peers(swarm: &mut Swarm<BusBehaviour>, peer_addrs: &[Multiaddr]) {
    for addr in peer_addrs {
        if let Err(e) = swarm.dial(addr.clone()) {
            tracing::debug!("Dial {} not started: {}", addr, e);
        }
    }
}

/// Handle a SwarmEvent from the libp2p Swarm.
fn handle_swarm_event(
    event: libp2p::swarm::SwarmEvent<BusBehaviourEvent>,
    evt_tx: &mpsc::UnboundedSender<BusEvent>,
) {
    use libp2p::swarm::SwarmEvent as LibSwarmEvent;

    match event {
        LibSwarmEvent::Behaviour(BusBehaviourEvent::Gossipsub(gossipsub::Event::Message {
            propagation_source,
            message,
            ..
        })) => {
            tracing::debug!(
                "Bus frame from {} on {}, {} bytes",
                propagation_source,
                message.topic,
                message.data.len()
            );
            let _ = evt_tx.send(BusEvent::Frame(message.data));
        }
        LibSwarmEvent::Behaviour(BusBehaviourEvent::Gossipsub(gossipsub::Event::Subscribed {
            peer_id,
            topic,
        })) => {
            tracing::info!("Bus peer {} subscribed to {}", peer_id, topic);
        }
        LibSwarmEvent::Behaviour(BusBehaviourEvent::Identify(identify::Event::Received {
            peer_id,
            info,
            ..
        })) => {
            tracing::debug!(
                "Identify: {} has {} listen addrs",
                peer_id,
                info.listen_addrs.len()
            );
        }
        LibSwarmEvent::ConnectionEstablished { peer_id, .. } => {
            tracing::info!("Bus peer connected: {}", peer_id);
        }
        LibSwarmEvent::ConnectionClosed { peer_id, .. } => {
            tracing::info!("Bus peer disconnected: {}", peer_id);
        }
        LibSwarmEvent::NewListenAddr { address, .. } => {
            tracing::info!("Bus listening on: {}", address);
        }
        _ => {}
    }
}

/// Handle a command from the dispatcher.
fn handle_bus_command(
    swarm: &mut Swarm<BusBehaviour>,
    topic: &gossipsub::IdentTopic,
    evt_tx: &mpsc::UnboundedSender<BusEvent>,
    cmd: BusCommand,
) {
    match cmd {
        BusCommand::Publish { data } => {
            // Local loopback first: our own viewers must see the frame even
            // when the mesh is empty or the publish fails.
            let _ = evt_tx.send(BusEvent::Frame(data.clone()));

            match swarm.behaviour_mut().gossipsub.publish(topic.clone(), data) {
                Ok(msg_id) => {
                    tracing::debug!("Published bus frame, message_id: {:?}", msg_id)
                }
                Err(gossipsub::PublishError::InsufficientPeers) => {
                    // Routine for a single-process deployment
                    tracing::debug!("No bus peers in mesh, frame delivered locally only")
                }
                Err(e) => tracing::warn!("Failed to publish bus frame: {:?}", e),
            }
        }
    }
}
