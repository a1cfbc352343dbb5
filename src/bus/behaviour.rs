use libp2p::{gossipsub, identify, identity, ping, swarm::NetworkBehaviour};
use std::time::Duration;

use super::config::BusConfig;

/// Composed NetworkBehaviour for the event bus node.
/// Gossipsub carries the frames; identify and ping keep the small
/// server-to-server mesh observable and alive.
#[derive(NetworkBehaviour)]
pub struct BusBehaviour {
    pub gossipsub: gossipsub::Behaviour,
    pub identify: identify::Behaviour,
    pub ping: ping::Behaviour,
}

/// Build the composed NetworkBehaviour with configuration from BusConfig.
pub fn build_behaviour(keypair: &identity::Keypair, config: &BusConfig) -> BusBehaviour {
    let gossipsub_config = gossipsub::ConfigBuilder::default()
        .mesh_n(config.mesh_n)
        .mesh_n_low(config.mesh_n_low)
        .mesh_n_high(config.mesh_n_high)
        .heartbeat_interval(Duration::from_secs(1))
        .max_transmit_size(config.max_transmit_size)
        .validation_mode(gossipsub::ValidationMode::Strict)
        // Every process must see every frame — flood to all topic peers,
        // not just the mesh.
        .flood_publish(true)
        // Default message ids (source + sequence number): resubmitting an
        // identical event produces a byte-identical frame, and peers must
        // still deliver each copy rather than drop it as already seen.
        .build()
        .expect("Valid gossipsub config");

    let gossipsub_behaviour = gossipsub::Behaviour::new(
        gossipsub::MessageAuthenticity::Signed(keypair.clone()),
        gossipsub_config,
    )
    .expect("Valid gossipsub behaviour");

    BusBehaviour {
        gossipsub: gossipsub_behaviour,
        identify: identify::Behaviour::new(identify::Config::new(
            "/pulseboard/1.0.0".to_string(),
            keypair.public(),
        )),
        ping: ping::Behaviour::default(),
    }
}
