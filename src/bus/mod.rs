pub mod behaviour;
pub mod config;
pub mod identity;
pub mod swarm;

// Re-export key types for convenient access
pub use config::BusConfig;
pub use swarm::{BusCommand, BusEvent};

use tokio::sync::mpsc;

/// Loopback bus loop for single-process deployments (`[bus] enabled = false`)
/// and tests: every published frame is echoed straight back to the
/// subscriber. Same channel contract as the swarm loop, no network.
pub async fn run_loopback_loop(
    mut cmd_rx: mpsc::UnboundedReceiver<BusCommand>,
    evt_tx: mpsc::UnboundedSender<BusEvent>,
) {
    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            BusCommand::Publish { data } => {
                let _ = evt_tx.send(BusEvent::Frame(data));
            }
        }
    }
    tracing::info!("Bus command channel closed, loopback loop exiting");
}
