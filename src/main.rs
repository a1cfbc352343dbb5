use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use pulseboard_server::bus;
use pulseboard_server::config::{generate_config_template, Config};
use pulseboard_server::db;
use pulseboard_server::dispatch;
use pulseboard_server::events::HistoryStore;
use pulseboard_server::routes;
use pulseboard_server::sse::{self, broadcast, ConnectionRegistry};
use pulseboard_server::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Initialize tracing/logging
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "pulseboard_server=info".parse().unwrap()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "pulseboard_server=info".parse().unwrap()),
            )
            .init();
    }

    tracing::info!("Pulseboard server v{} starting", env!("CARGO_PKG_VERSION"));

    // Initialize the history database and rebuild the in-memory store so
    // late joiners replay state from before the restart
    let db = db::init_db(&config.data_dir)?;
    let rows = db::load_history(&db)?;
    if !rows.is_empty() {
        tracing::info!("Restored {} history entries", rows.len());
    }
    let history = Arc::new(HistoryStore::from_entries(rows));

    let connections = sse::new_connection_registry();

    // --- Broadcast bus setup ---
    let (bus_cmd_tx, bus_cmd_rx) = mpsc::unbounded_channel::<bus::BusCommand>();
    let (bus_evt_tx, bus_evt_rx) = mpsc::unbounded_channel::<bus::BusEvent>();

    let bus_config = config.bus.clone().unwrap_or_default();
    if bus_config.enabled {
        // Load or generate the bus's libp2p Ed25519 identity keypair
        let keypair = bus::identity::bus_identity_keypair(&config.data_dir);
        let swarm = bus::swarm::build_swarm(keypair, &bus_config).await;
        tokio::spawn(bus::swarm::run_bus_loop(
            swarm, bus_config, bus_cmd_rx, bus_evt_tx,
        ));
    } else {
        tracing::info!("Bus disabled, running local loopback fan-out");
        tokio::spawn(bus::run_loopback_loop(bus_cmd_rx, bus_evt_tx));
    }

    // One subscriber loop per process: bus frames -> local viewers
    tokio::spawn(dispatch::run_subscriber(bus_evt_rx, connections.clone()));

    // Build application state
    let app_state = AppState {
        db,
        history,
        connections: connections.clone(),
        bus_tx: bus_cmd_tx,
        auth_token: config.auth_token.clone(),
    };

    // Build router
    let app = routes::build_router(app_state);

    // Bind and serve
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(connections))
        .await?;

    Ok(())
}

/// Wait for ctrl-c or SIGTERM, then close every open viewer stream so
/// clients observe a clean stream termination rather than a hang.
async fn shutdown_signal(connections: ConnectionRegistry) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    broadcast::close_all(&connections);
}
