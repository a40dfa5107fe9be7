//! DMX senders
//!
//! A sender owns the channel state of one universe and broadcasts it as
//! ArtDmx. Art-Net gives no delivery guarantee, so besides sending on every
//! change the sender re-sends its full state on a fixed interval whether or
//! not anything changed.

use std::net::{SocketAddr, SocketAddrV4};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::address::UniverseAddress;
use crate::error::{DmxnetError, ValidationError};
use crate::events::{EventBus, NodeEvent};
use crate::frame::ChannelFrame;
use crate::net::{is_broadcast, parse_ipv4};
use crate::protocol::{encode_dmx, ARTNET_PORT};
use crate::transport::Outbound;

/// First sequence number; 0 means "sequencing disabled" on the wire
pub const FIRST_SEQUENCE: u8 = 1;

/// Configuration for a sender
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderOptions {
    #[serde(flatten)]
    pub address: UniverseAddress,
    /// Destination IPv4, broadcast by default
    pub ip: String,
    /// Destination UDP port
    pub port: u16,
    /// Milliseconds between unconditional retransmissions
    pub refresh_interval_ms: u64,
}

impl Default for SenderOptions {
    fn default() -> Self {
        Self {
            address: UniverseAddress::default(),
            ip: "255.255.255.255".to_string(),
            port: ARTNET_PORT,
            refresh_interval_ms: 1000,
        }
    }
}

impl SenderOptions {
    pub fn new(address: UniverseAddress) -> Self {
        Self {
            address,
            ..Default::default()
        }
    }

    pub fn with_destination(mut self, ip: impl Into<String>, port: u16) -> Self {
        self.ip = ip.into();
        self.port = port;
        self
    }

    /// Intervals beyond `u64::MAX` milliseconds saturate
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Resolved destination socket address
    pub fn destination(&self) -> Result<SocketAddrV4, ValidationError> {
        Ok(SocketAddrV4::new(parse_ipv4(&self.ip)?, self.port))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.destination()?;
        if self.refresh_interval_ms == 0 {
            return Err(ValidationError::RefreshInterval);
        }
        Ok(())
    }
}

pub(crate) type SenderTable = Mutex<Vec<Sender>>;

/// Handle to a running sender
///
/// Cloning yields another handle to the same sender.
#[derive(Clone)]
pub struct Sender {
    inner: Arc<SenderInner>,
}

struct SenderInner {
    address: UniverseAddress,
    destination: SocketAddrV4,
    broadcast: bool,
    refresh_interval: Duration,
    state: Mutex<SenderState>,
    outbound: Outbound,
    events: EventBus,
    timer: Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
    owner: Weak<SenderTable>,
}

struct SenderState {
    frame: ChannelFrame,
    sequence: u8,
}

impl Sender {
    pub(crate) fn new(
        options: &SenderOptions,
        outbound: Outbound,
        events: EventBus,
        owner: Weak<SenderTable>,
    ) -> Result<Self, ValidationError> {
        options.validate()?;
        let destination = options.destination()?;
        let broadcast = is_broadcast(&options.ip)?;

        Ok(Self {
            inner: Arc::new(SenderInner {
                address: options.address,
                destination,
                broadcast,
                refresh_interval: Duration::from_millis(options.refresh_interval_ms),
                state: Mutex::new(SenderState {
                    frame: ChannelFrame::default(),
                    sequence: FIRST_SEQUENCE,
                }),
                outbound,
                events,
                timer: Mutex::new(None),
                stopped: AtomicBool::new(false),
                owner,
            }),
        })
    }

    /// Spawn the retransmission task on the current tokio runtime
    ///
    /// Outside a runtime the sender only transmits on explicit calls.
    pub(crate) fn start_timer(&self) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(
                    "No tokio runtime, sender {} will not refresh periodically",
                    self.address()
                );
                return;
            }
        };

        let period = self.inner.refresh_interval;
        let weak = Arc::downgrade(&self.inner);
        let task = handle.spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticker.tick().await;
                match weak.upgrade() {
                    Some(inner) => {
                        let _ = Sender { inner }.transmit();
                    }
                    None => break,
                }
            }
        });
        *self.inner.timer.lock() = Some(task);
    }

    pub fn address(&self) -> UniverseAddress {
        self.inner.address
    }

    pub fn key(&self) -> u16 {
        self.inner.address.key()
    }

    pub fn destination(&self) -> SocketAddrV4 {
        self.inner.destination
    }

    /// Whether the destination is a broadcast address
    pub fn is_broadcast(&self) -> bool {
        self.inner.broadcast
    }

    pub fn refresh_interval(&self) -> Duration {
        self.inner.refresh_interval
    }

    /// Sequence number the next packet will carry
    pub fn sequence(&self) -> u8 {
        self.inner.state.lock().sequence
    }

    /// Snapshot of the current channel values
    pub fn values(&self) -> ChannelFrame {
        self.inner.state.lock().frame
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    /// Set one channel and transmit
    pub fn set_channel(&self, channel: usize, value: u8) -> Result<(), ValidationError> {
        self.prepare_channel(channel, value)?;
        let _ = self.transmit();
        Ok(())
    }

    /// Set one channel without transmitting
    ///
    /// Staged values go out with the next transmission.
    pub fn prepare_channel(&self, channel: usize, value: u8) -> Result<(), ValidationError> {
        self.inner.state.lock().frame.set(channel, value)
    }

    /// Set the inclusive block `start..=stop` and transmit
    pub fn fill_channels(&self, start: usize, stop: usize, value: u8) -> Result<(), ValidationError> {
        self.inner.state.lock().frame.fill(start, stop, value)?;
        let _ = self.transmit();
        Ok(())
    }

    /// Zero all channels and transmit
    pub fn reset(&self) {
        self.inner.state.lock().frame.clear();
        let _ = self.transmit();
    }

    /// Send the current frame
    ///
    /// Does nothing until the node's outbound socket is bound or after the
    /// sender was stopped. Returns whether a packet went out. Send failures
    /// are logged and published as events before being returned.
    pub fn transmit(&self) -> Result<bool, DmxnetError> {
        if self.is_stopped() {
            return Ok(false);
        }

        let inner = &self.inner;
        let key = inner.address.key();
        let target = SocketAddr::V4(inner.destination);

        // The lock spans the send so packets leave in sequence order
        let mut state = inner.state.lock();
        if !inner.outbound.is_ready() {
            trace!("Outbound socket not ready, skipping frame for {}", inner.address);
            return Ok(false);
        }

        let sequence = state.sequence;
        let packet = encode_dmx(sequence, key, &state.frame);
        let result = inner.outbound.send(&packet, target);
        state.sequence = next_sequence(sequence);
        drop(state);

        match result {
            Ok(sent) => {
                if sent {
                    trace!("Sent ArtDmx for {} seq {} -> {}", inner.address, sequence, target);
                    inner.events.emit(NodeEvent::FrameSent { key, sequence });
                }
                Ok(sent)
            }
            Err(e) => {
                warn!("Failed to send ArtDmx to {}: {}", target, e);
                inner.events.emit(NodeEvent::TransportError {
                    target,
                    error: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    /// Cancel the refresh timer and detach from the node
    ///
    /// Later calls, and later transmissions, are no-ops.
    pub fn stop(&self) {
        if self.inner.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(task) = self.inner.timer.lock().take() {
            task.abort();
        }
        if let Some(table) = self.inner.owner.upgrade() {
            table.lock().retain(|s| !Arc::ptr_eq(&s.inner, &self.inner));
        }

        debug!("Sender {} stopped", self.inner.address);
        self.inner.events.emit(NodeEvent::SenderStopped { key: self.key() });
    }

    pub fn ptr_eq(&self, other: &Sender) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sender")
            .field("address", &self.inner.address)
            .field("destination", &self.inner.destination)
            .field("refresh_interval", &self.inner.refresh_interval)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// 1..=255, wrapping back to 1
fn next_sequence(sequence: u8) -> u8 {
    if sequence == u8::MAX {
        FIRST_SEQUENCE
    } else {
        sequence + 1
    }
}
