//! Node events
//!
//! Observable happenings are fanned out to any number of subscribers over a
//! broadcast channel. Nothing inside the node reacts to its own events.

use std::net::SocketAddr;

use tokio::sync::broadcast;

use crate::controller::ControllerRecord;
use crate::error::FormatError;

/// Capacity of the event channel; slow subscribers lose the oldest events
pub const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    /// Listening socket bound
    Listening { port: u16 },
    /// Any datagram arrived
    PacketReceived { from: SocketAddr, len: usize },
    /// ArtDmx decoded for a universe
    FrameReceived { key: u16, channels: usize },
    /// ArtPoll accepted
    PollDetected { from: SocketAddr },
    /// First poll from a controller, or a controller came back
    ControllerDiscovered(ControllerRecord),
    /// Controller stopped polling
    ControllerLost { ip: String },
    /// ArtPollReply from another node
    PollReplyDetected { from: SocketAddr, short_name: String },
    /// One ArtPollReply sent
    ReplySent { target: SocketAddr, bind_index: u8 },
    /// ArtDmx sent by a sender
    FrameSent { key: u16, sequence: u8 },
    SenderStarted { key: u16 },
    SenderStopped { key: u16 },
    ReceiverStarted { key: u16 },
    /// Malformed datagram dropped
    FormatError { from: SocketAddr, error: FormatError },
    /// Datagram with an opcode this node ignores
    UnsupportedOpCode { from: SocketAddr, opcode: u16 },
    /// A send failed; nothing is retried
    TransportError { target: SocketAddr, error: String },
}

/// Sending half of the event channel
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<NodeEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NodeEvent> {
        self.tx.subscribe()
    }

    /// Publish, ignoring the absence of subscribers
    pub fn emit(&self, event: NodeEvent) {
        let _ = self.tx.send(event);
    }
}
