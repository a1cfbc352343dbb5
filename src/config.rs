use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::bus::BusConfig;

/// Pulseboard event server
#[derive(Parser, Serialize, Deserialize, Clone, Debug)]
#[command(name = "pulseboard-server", version, about = "Pulseboard event server")]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "PULSEBOARD_PORT", default_value = "3030")]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "PULSEBOARD_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Path to TOML config file
    #[arg(long, default_value = "./pulseboard.toml")]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "PULSEBOARD_JSON_LOGS")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Data directory for persistent state (history DB, bus identity key)
    #[arg(long, env = "PULSEBOARD_DATA_DIR", default_value = "./data")]
    pub data_dir: String,

    /// Shared-secret token required from producers and viewers.
    /// Unset means open access.
    #[arg(long, env = "PULSEBOARD_AUTH_TOKEN")]
    pub auth_token: Option<String>,

    /// Broadcast bus configuration (loaded from [bus] section in TOML)
    #[arg(skip)]
    #[serde(default = "default_bus_config")]
    pub bus: Option<BusConfig>,
}

fn default_bus_config() -> Option<BusConfig> {
    Some(BusConfig::default())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3030,
            bind_address: "0.0.0.0".to_string(),
            config: "./pulseboard.toml".to_string(),
            json_logs: false,
            generate_config: false,
            data_dir: "./data".to_string(),
            auth_token: None,
            bus: Some(BusConfig::default()),
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (PULSEBOARD_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        let cli = Config::parse();
        let config_path = cli.config.clone();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("PULSEBOARD_"))
            .merge(Serialized::defaults(cli))
            .extract()
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# Pulseboard Event Server Configuration
# Place this file at ./pulseboard.toml or specify with --config <path>
# All settings can be overridden via environment variables (PULSEBOARD_PORT,
# etc.) or CLI flags (--port, etc.)

# HTTP port for submissions and the /events stream (default: 3030)
# port = 3030

# Bind address (default: 0.0.0.0 — all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Data directory for the history database and bus identity key
# data_dir = "./data"

# Shared-secret token producers must send as `auth_token` in the submission
# body and viewers as `?auth_token=` on /events. Unset = open access.
# auth_token = ""

# ---- Broadcast Bus ----
# [bus]

# Disable to run a single process with a local loopback bus
# enabled = true

# libp2p WebSocket listener port (separate from the HTTP port)
# libp2p_port = 3031

# Topic shared by every server process
# topic = "pulseboard/events"

# Peer processes to dial, e.g. ["/ip4/10.0.0.2/tcp/3031/ws"]
# Peers are re-dialed on a timer, so restarts heal automatically.
# peers = []
# redial_interval_secs = 30

# Gossipsub mesh parameters (server meshes are small and fixed)
# mesh_n = 4
# mesh_n_low = 3
# mesh_n_high = 8
# max_transmit_size = 65536  # Max frame size in bytes (64 KiB)
"#
    .to_string()
}
