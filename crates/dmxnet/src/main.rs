//! dmxnet - OpenSource Art-Net transceiver
//!
//! Runs an Art-Net node with the senders and receivers listed in a config
//! file. Usage: `dmxnet [config.toml]`.

#![warn(missing_docs)]

mod logging_setup;

use std::path::PathBuf;

use anyhow::{Context, Result};
use dmxnet_core::{Node, NodeConfig, NodeEvent};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

const DEFAULT_CONFIG: &str = "dmxnet.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    let _log_guard = logging_setup::init(&config.log)?;

    let node = Node::new(&config).context("Invalid node configuration")?;
    let local = node.bind().await.context("Failed to bind Art-Net sockets")?;
    info!(
        "{} ({}) up on {}, advertising on {} interface(s)",
        config.short_name,
        config.long_name,
        local,
        node.interfaces().len()
    );

    let events = node.subscribe();
    let event_log = tokio::spawn(log_events(events));

    let (senders, receivers) = node
        .create_configured(&config)
        .context("Failed to create configured ports")?;
    info!(
        "{} sender(s), {} receiver(s) running",
        senders.len(),
        receivers.len()
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    info!("Shutting down");
    node.shutdown();
    event_log.abort();
    Ok(())
}

/// Config path from the first argument, else `dmxnet.toml` if present
fn load_config() -> Result<NodeConfig> {
    let path = match std::env::args_os().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG);
            if !default.exists() {
                return Ok(NodeConfig::default());
            }
            default
        }
    };

    NodeConfig::load(&path).with_context(|| format!("Failed to load config {:?}", path))
}

async fn log_events(mut events: tokio::sync::broadcast::Receiver<NodeEvent>) {
    loop {
        match events.recv().await {
            Ok(NodeEvent::ControllerDiscovered(controller)) => {
                info!(
                    "Controller {} (priority {}) polling",
                    controller.ip, controller.priority
                );
            }
            Ok(NodeEvent::PollReplyDetected { from, short_name }) => {
                debug!("Node {:?} announced from {}", short_name, from);
            }
            Ok(NodeEvent::FormatError { from, error }) => {
                debug!("Malformed packet from {}: {}", from, error);
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                warn!("Event log lagging, skipped {} events", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}
