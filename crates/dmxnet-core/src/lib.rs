//! dmxnet core - Art-Net node engine
//!
//! This crate implements an Art-Net node that plays three roles at once:
//! - **Sender**: periodically broadcasts the 512 channels of a universe
//! - **Receiver**: keeps the latest channels received for a universe
//! - **Discovery**: answers ArtPoll with ArtPollReply and tracks which
//!   controllers are alive
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dmxnet_core::{Node, NodeConfig, SenderOptions, UniverseAddress};
//!
//! # async fn run() -> dmxnet_core::Result<()> {
//! let node = Node::new(&NodeConfig::default())?;
//! node.bind().await?;
//!
//! let sender = node.create_sender(&SenderOptions::new(UniverseAddress::new(0, 0, 1)?))?;
//! sender.set_channel(0, 255)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`address`] - Net/Subnet/Universe addressing
//! - [`protocol`] - Packet encoding and decoding
//! - [`sender`] / [`receiver`] - Universe endpoints
//! - [`controller`] - Remote controller liveness
//! - [`node`] - Coordinator tying it all together
//! - [`error`] - Error types

pub mod address;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod frame;
pub mod logging;
pub mod net;
pub mod node;
pub mod protocol;
pub mod receiver;
pub mod sender;
pub mod transport;

pub use address::UniverseAddress;
pub use config::NodeConfig;
pub use controller::{ControllerRecord, ControllerRegistry};
pub use error::{DmxnetError, FormatError, Result, ValidationError};
pub use events::NodeEvent;
pub use frame::{ChannelFrame, CHANNELS};
pub use logging::LogConfig;
pub use net::{is_broadcast, InterfaceInfo};
pub use node::Node;
pub use receiver::{Receiver, ReceiverOptions};
pub use sender::{Sender, SenderOptions};
pub use transport::{DatagramSink, Outbound, RecordingSink};
