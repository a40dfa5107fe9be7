//! Node configuration
//!
//! Loaded from TOML or JSON. Every field has a default, so an empty file is a
//! valid configuration for a node with no ports.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DmxnetError, Result};
use crate::logging::LogConfig;
use crate::net::{InterfaceConfig, InterfaceInfo};
use crate::protocol::ARTNET_PORT;
use crate::receiver::ReceiverOptions;
use crate::sender::SenderOptions;

pub const DEFAULT_OEM: u16 = 0x2908;
pub const DEFAULT_SHORT_NAME: &str = "dmxnet";
pub const DEFAULT_LONG_NAME: &str = "dmxnet - OpenSource ArtNet Transceiver";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// OEM code advertised in replies
    pub oem: u16,
    /// UDP port to listen on and to address replies to
    pub port: u16,
    /// Truncated to 16 bytes on the wire
    pub short_name: String,
    /// Truncated to 63 bytes on the wire
    pub long_name: String,
    /// Interfaces to advertise on
    pub interfaces: Vec<InterfaceConfig>,
    pub senders: Vec<SenderOptions>,
    pub receivers: Vec<ReceiverOptions>,
    pub log: LogConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            oem: DEFAULT_OEM,
            port: ARTNET_PORT,
            short_name: DEFAULT_SHORT_NAME.to_string(),
            long_name: DEFAULT_LONG_NAME.to_string(),
            interfaces: Vec::new(),
            senders: Vec::new(),
            receivers: Vec::new(),
            log: LogConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load a config file, JSON if the extension says so, TOML otherwise
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;

        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&text)?,
            _ => toml::from_str(&text)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check everything that serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.short_name.is_empty() {
            return Err(DmxnetError::Config("short_name must not be empty".to_string()));
        }
        for sender in &self.senders {
            sender.validate()?;
        }
        self.interface_infos()?;
        Ok(())
    }

    /// Resolved interfaces, falling back to the limited broadcast address
    pub fn interface_infos(&self) -> Result<Vec<InterfaceInfo>> {
        if self.interfaces.is_empty() {
            return Ok(vec![InterfaceInfo::limited_broadcast()]);
        }
        self.interfaces
            .iter()
            .map(|iface| InterfaceInfo::try_from(iface).map_err(DmxnetError::from))
            .collect()
    }
}
