//! Art-Net packet codec
//!
//! Stateless encoders and decoders for the three messages this node speaks:
//!
//! - **ArtPoll** (0x2000): controllers ask every node to announce itself
//! - **ArtPollReply** (0x2100): a node's announcement, one per advertised port
//! - **ArtDmx** (0x5000): up to 512 channel values for one universe
//!
//! Field offsets live in [`constants`]. They are a compatibility contract with
//! other Art-Net equipment and must not move.

pub mod constants;
pub mod dmx;
pub mod header;
pub mod poll;
pub mod reply;

pub use constants::{ARTNET_PORT, OP_DMX, OP_POLL, OP_POLL_REPLY, PROTOCOL_VERSION};
pub use dmx::{decode_dmx, encode_dmx, DmxFrame};
pub use header::{decode_header, OpCode};
pub use poll::PollRequest;
pub use reply::{encode_reply, NodeInfo, PollReply, PortBinding};
