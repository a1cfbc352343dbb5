use serde::{Deserialize, Serialize};

/// Cross-process broadcast bus configuration.
/// Exposed in `pulseboard.toml` under the `[bus]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Whether the cross-process mesh is enabled. When false the server runs
    /// a local loopback bus: events still reach this process's own viewers,
    /// but peer processes are not involved.
    /// Default: true
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// libp2p WebSocket listener port (separate from the HTTP port).
    /// Default: 3031
    #[serde(default = "default_libp2p_port")]
    pub libp2p_port: u16,

    /// Gossipsub topic all server processes publish and subscribe on.
    /// Payloads are raw wire-frame bytes, no envelope.
    /// Default: "pulseboard/events"
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Multiaddrs of peer server processes to dial, e.g.
    /// "/ip4/10.0.0.2/tcp/3031/ws". Dialed at startup and re-dialed on a
    /// timer, so a peer that restarts is picked back up automatically.
    #[serde(default)]
    pub peers: Vec<String>,

    /// Seconds between re-dial attempts for configured peers. Reconnection
    /// retries indefinitely at this fixed rate — peer lists are short and
    /// static, so a bounded constant interval is used instead of exponential
    /// backoff.
    /// Default: 30
    #[serde(default = "default_redial_interval_secs")]
    pub redial_interval_secs: u64,

    /// Gossipsub mesh degree (D parameter).
    /// Default: 4 (server meshes are small and fixed)
    #[serde(default = "default_mesh_n")]
    pub mesh_n: usize,

    /// Gossipsub mesh low watermark (D_lo).
    /// Default: 3
    #[serde(default = "default_mesh_n_low")]
    pub mesh_n_low: usize,

    /// Gossipsub mesh high watermark (D_hi).
    /// Default: 8
    #[serde(default = "default_mesh_n_high")]
    pub mesh_n_high: usize,

    /// Maximum size of a single gossipsub message in bytes.
    /// Default: 65536 (64 KiB — a frame carries one JSON event)
    #[serde(default = "default_max_transmit_size")]
    pub max_transmit_size: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            libp2p_port: default_libp2p_port(),
            topic: default_topic(),
            peers: Vec::new(),
            redial_interval_secs: default_redial_interval_secs(),
            mesh_n: default_mesh_n(),
            mesh_n_low: default_mesh_n_low(),
            mesh_n_high: default_mesh_n_high(),
            max_transmit_size: default_max_transmit_size(),
        }
    }
}

fn default_enabled() -> bool {
    true
}
fn default_libp2p_port() -> u16 {
    3031
}
fn default_topic() -> String {
    "pulseboard/events".to_string()
}
fn default_redial_interval_secs() -> u64 {
    30
}
fn default_mesh_n() -> usize {
    4
}
fn default_mesh_n_low() -> usize {
    3
}
fn default_mesh_n_high() -> usize {
    8
}
fn default_max_transmit_size() -> usize {
    65536
}
