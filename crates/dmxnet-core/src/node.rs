//! The Art-Net node
//!
//! A [`Node`] owns the outbound socket and every sender, receiver and known
//! controller. Inbound datagrams are dispatched by opcode:
//!
//! | Opcode | Action |
//! |---|---|
//! | ArtDmx | hand channels to the receiver bound to the universe, if any |
//! | ArtPoll | record the controller, then broadcast replies |
//! | ArtPollReply | publish an event only |
//! | other | publish an unsupported-opcode warning |
//!
//! Replies are broadcast on every interface, one per sender and receiver,
//! whenever a poll arrives or a port is created.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::address::UniverseAddress;
use crate::config::NodeConfig;
use crate::controller::{ControllerRecord, ControllerRegistry, SWEEP_INTERVAL_SECS};
use crate::error::{FormatError, Result, ValidationError};
use crate::events::{EventBus, NodeEvent};
use crate::net::InterfaceInfo;
use crate::protocol::{
    decode_dmx, decode_header, encode_reply, NodeInfo, OpCode, PollReply, PollRequest,
    PortBinding,
};
use crate::receiver::{Receiver, ReceiverOptions, ReceiverRegistry};
use crate::sender::{Sender, SenderOptions, SenderTable};
use crate::transport::{DatagramSink, Outbound};

/// Largest datagram the listener accepts
const MAX_DATAGRAM: usize = 2048;
/// Node report counter wraps after this value
const MAX_REPLY_COUNT: u16 = 9999;
/// Pause after a transient receive error
const RECV_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Identity fields copied into every reply
#[derive(Debug, Clone)]
struct Identity {
    oem: u16,
    port: u16,
    short_name: String,
    long_name: String,
}

/// Wall-clock time advanced by the tokio clock
///
/// Controller timestamps follow tokio time, so a paused test runtime ages
/// controllers the same way real time does.
#[derive(Debug, Clone, Copy)]
struct Clock {
    started: tokio::time::Instant,
    started_utc: DateTime<Utc>,
}

impl Clock {
    fn new() -> Self {
        Self {
            started: tokio::time::Instant::now(),
            started_utc: Utc::now(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.started.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.started_utc + elapsed
    }
}

/// Handle to an Art-Net node; clones share the same node
///
/// Background tasks stop when the last handle is dropped.
#[derive(Clone)]
pub struct Node {
    shared: Arc<NodeShared>,
}

struct NodeShared {
    identity: Identity,
    interfaces: Vec<InterfaceInfo>,
    outbound: Outbound,
    events: EventBus,
    senders: Arc<SenderTable>,
    receivers: RwLock<ReceiverRegistry>,
    controllers: Mutex<ControllerRegistry>,
    reply_count: Mutex<u16>,
    clock: Clock,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl NodeShared {
    fn stop_all(&self) {
        // Taken out first: Sender::stop locks the table to remove itself
        let senders = std::mem::take(&mut *self.senders.lock());
        for sender in senders {
            sender.stop();
        }
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        self.outbound.detach();
    }
}

impl Drop for NodeShared {
    fn drop(&mut self) {
        self.stop_all();
        debug!("Art-Net node dropped");
    }
}

impl Node {
    /// Create a node from configuration
    ///
    /// Configured senders and receivers are not created here; see
    /// [`Node::create_configured`].
    pub fn new(config: &NodeConfig) -> Result<Self> {
        config.validate()?;
        let interfaces = config.interface_infos()?;
        Ok(Self::with_interfaces(config, interfaces))
    }

    /// Create a node advertising on explicit interfaces
    pub fn with_interfaces(config: &NodeConfig, interfaces: Vec<InterfaceInfo>) -> Self {
        Self {
            shared: Arc::new(NodeShared {
                identity: Identity {
                    oem: config.oem,
                    port: config.port,
                    short_name: config.short_name.clone(),
                    long_name: config.long_name.clone(),
                },
                interfaces,
                outbound: Outbound::new(),
                events: EventBus::new(),
                senders: Arc::new(SenderTable::default()),
                receivers: RwLock::new(ReceiverRegistry::new()),
                controllers: Mutex::new(ControllerRegistry::new()),
                reply_count: Mutex::new(0),
                clock: Clock::new(),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Bind the listening and outbound sockets and start background tasks
    ///
    /// Returns the local address of the listening socket.
    pub async fn bind(&self) -> Result<SocketAddr> {
        let port = self.shared.identity.port;
        let listener = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port)).await?;
        let local = listener.local_addr()?;

        let outbound = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        outbound.set_broadcast(true)?;
        // try_send_to reports WouldBlock until the reactor has seen the socket writable
        outbound.writable().await?;
        self.attach_transport(Arc::new(outbound));

        info!("Art-Net node listening on {}", local);
        self.shared
            .events
            .emit(NodeEvent::Listening { port: local.port() });

        self.spawn_listener(Arc::new(listener));
        self.spawn_sweeper();
        Ok(local)
    }

    /// Install the socket every outbound packet goes through
    pub fn attach_transport(&self, sink: Arc<dyn DatagramSink>) {
        self.shared.outbound.attach(sink);
    }

    /// Receive datagrams from `socket` until the node shuts down
    pub fn spawn_listener(&self, socket: Arc<UdpSocket>) {
        let weak = Arc::downgrade(&self.shared);
        let task = tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM];
            loop {
                match socket.recv_from(&mut buf).await {
                    Ok((len, from)) => {
                        let Some(node) = upgrade(&weak) else { break };
                        let _ = node.handle_datagram(&buf[..len], from);
                    }
                    Err(e) if is_transient(&e) => {
                        warn!("Art-Net receive error: {}", e);
                        tokio::time::sleep(RECV_RETRY_DELAY).await;
                        if weak.strong_count() == 0 {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Art-Net listener stopped: {}", e);
                        break;
                    }
                }
            }
        });
        self.shared.tasks.lock().push(task);
    }

    /// Check controller liveness every 30 seconds
    pub fn spawn_sweeper(&self) {
        let weak = Arc::downgrade(&self.shared);
        let period = Duration::from_secs(SWEEP_INTERVAL_SECS);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let Some(node) = upgrade(&weak) else { break };
                node.sweep_controllers(node.now());
            }
        });
        self.shared.tasks.lock().push(task);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NodeEvent> {
        self.shared.events.subscribe()
    }

    /// Create a sender, transmit its first frame and announce it
    pub fn create_sender(&self, options: &SenderOptions) -> std::result::Result<Sender, ValidationError> {
        let sender = Sender::new(
            options,
            self.shared.outbound.clone(),
            self.shared.events.clone(),
            Arc::downgrade(&self.shared.senders),
        )?;

        info!(
            "Sender started for {} -> {} every {:?}",
            sender.address(),
            sender.destination(),
            sender.refresh_interval()
        );
        if sender.is_broadcast() {
            debug!("Sender {} uses a broadcast destination", sender.address());
        }
        self.shared
            .events
            .emit(NodeEvent::SenderStarted { key: sender.key() });

        let _ = sender.transmit();
        sender.start_timer();

        self.shared.senders.lock().push(sender.clone());
        self.broadcast_reply();
        Ok(sender)
    }

    /// Create a receiver, register it for its universe and announce it
    pub fn create_receiver(&self, options: &ReceiverOptions) -> Receiver {
        let receiver = Receiver::new(options.address);
        info!("Receiver started for {}", receiver.address());
        self.shared
            .events
            .emit(NodeEvent::ReceiverStarted { key: receiver.key() });

        self.shared.receivers.write().register(receiver.clone());
        self.broadcast_reply();
        receiver
    }

    /// Create every sender and receiver listed in `config`
    pub fn create_configured(
        &self,
        config: &NodeConfig,
    ) -> std::result::Result<(Vec<Sender>, Vec<Receiver>), ValidationError> {
        let senders = config
            .senders
            .iter()
            .map(|options| self.create_sender(options))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let receivers = config
            .receivers
            .iter()
            .map(|options| self.create_receiver(options))
            .collect();
        Ok((senders, receivers))
    }

    /// Process one inbound datagram
    ///
    /// Errors are logged and published before being returned; the node keeps
    /// running either way.
    pub fn handle_datagram(&self, buf: &[u8], from: SocketAddr) -> std::result::Result<OpCode, FormatError> {
        trace!("Received {} bytes from {}", buf.len(), from);
        self.shared.events.emit(NodeEvent::PacketReceived {
            from,
            len: buf.len(),
        });

        let result = self.dispatch(buf, from);
        match &result {
            Ok(_) => {}
            Err(FormatError::UnsupportedOpCode(opcode)) => {
                warn!("OpCode {:#06x} from {} not implemented", opcode, from);
                self.shared.events.emit(NodeEvent::UnsupportedOpCode {
                    from,
                    opcode: *opcode,
                });
            }
            Err(error) => {
                warn!("Dropped packet from {}: {}", from, error);
                self.shared.events.emit(NodeEvent::FormatError {
                    from,
                    error: error.clone(),
                });
            }
        }
        result
    }

    fn dispatch(&self, buf: &[u8], from: SocketAddr) -> std::result::Result<OpCode, FormatError> {
        let opcode = decode_header(buf)?;
        match opcode {
            OpCode::Dmx => self.handle_dmx(buf)?,
            OpCode::Poll => self.handle_poll(buf, from, self.now())?,
            OpCode::PollReply => self.handle_poll_reply(buf, from),
            OpCode::Other(value) => return Err(FormatError::UnsupportedOpCode(value)),
        }
        Ok(opcode)
    }

    fn handle_dmx(&self, buf: &[u8]) -> std::result::Result<(), FormatError> {
        let frame = decode_dmx(buf)?;
        debug!("Received frame for SubUniNet {:#06x}", frame.key);
        self.shared.events.emit(NodeEvent::FrameReceived {
            key: frame.key,
            channels: frame.channels.len(),
        });

        // Unrouted universes are silently ignored
        let receiver = self.shared.receivers.read().lookup(frame.key).cloned();
        if let Some(receiver) = receiver {
            receiver.apply(frame.channels);
        }
        Ok(())
    }

    fn handle_poll(
        &self,
        buf: &[u8],
        from: SocketAddr,
        now: DateTime<Utc>,
    ) -> std::result::Result<(), FormatError> {
        let poll = PollRequest::decode(buf)?;
        debug!("ArtPoll from {}", from);
        self.shared.events.emit(NodeEvent::PollDetected { from });

        let family = if from.is_ipv4() { "IPv4" } else { "IPv6" };
        let record = ControllerRecord::from_poll(from.ip().to_string(), family.to_string(), &poll, now);
        let discovered = self.shared.controllers.lock().upsert(record.clone());
        if discovered {
            info!("Controller discovered at {}", record.ip);
            self.shared
                .events
                .emit(NodeEvent::ControllerDiscovered(record));
        }

        self.broadcast_reply();
        Ok(())
    }

    fn handle_poll_reply(&self, buf: &[u8], from: SocketAddr) {
        let short_name = PollReply::decode(buf)
            .map(|reply| reply.short_name)
            .unwrap_or_default();
        debug!("ArtPollReply from {} ({})", from, short_name);
        self.shared
            .events
            .emit(NodeEvent::PollReplyDetected { from, short_name });
    }

    /// Announce this node on every interface
    ///
    /// One reply per sender, then one per receiver; a node with neither sends
    /// one self-describing reply. Bind indices restart at 1 on each interface.
    /// Returns the number of replies sent.
    pub fn broadcast_reply(&self) -> usize {
        let shared = &self.shared;
        if !shared.outbound.is_ready() {
            debug!("Outbound socket not ready, skipping ArtPollReply");
            return 0;
        }

        let count = {
            let mut count = shared.reply_count.lock();
            let current = *count;
            *count = if current >= MAX_REPLY_COUNT { 0 } else { current + 1 };
            current
        };
        let report = format!("#0001 [{:04}] dmxnet ArtNet-Transceiver running", count);

        let mut bindings: Vec<PortBinding> = shared
            .senders
            .lock()
            .iter()
            .map(|s| PortBinding::Input(s.address()))
            .collect();
        bindings.extend(
            shared
                .receivers
                .read()
                .all()
                .iter()
                .map(|r| PortBinding::Output(r.address())),
        );
        if bindings.is_empty() {
            bindings.push(PortBinding::Unbound);
        }

        let mut sent = 0;
        for iface in &shared.interfaces {
            let info = NodeInfo {
                ip: iface.ip,
                mac: iface.mac,
                port: shared.identity.port,
                oem: shared.identity.oem,
                short_name: &shared.identity.short_name,
                long_name: &shared.identity.long_name,
                report: &report,
            };
            let target = SocketAddr::from((iface.broadcast, shared.identity.port));

            let mut bind_index: u8 = 1;
            for binding in &bindings {
                let packet = encode_reply(&info, *binding, bind_index);
                if self.send_reply(&packet, target, bind_index) {
                    sent += 1;
                }
                bind_index = if bind_index == u8::MAX { 1 } else { bind_index + 1 };
            }
        }
        sent
    }

    fn send_reply(&self, packet: &[u8], target: SocketAddr, bind_index: u8) -> bool {
        match self.shared.outbound.send(packet, target) {
            Ok(sent) => {
                if sent {
                    debug!("ArtPollReply sent to {} (bind index {})", target, bind_index);
                    self.shared
                        .events
                        .emit(NodeEvent::ReplySent { target, bind_index });
                }
                sent
            }
            Err(e) => {
                warn!("Failed to send ArtPollReply to {}: {}", target, e);
                self.shared.events.emit(NodeEvent::TransportError {
                    target,
                    error: e.to_string(),
                });
                false
            }
        }
    }

    /// Flag controllers that have been silent for over a minute
    pub fn sweep_controllers(&self, now: DateTime<Utc>) -> Vec<String> {
        let lost = self.shared.controllers.lock().sweep_stale(now);
        for ip in &lost {
            info!("Controller lost: {}", ip);
            self.shared
                .events
                .emit(NodeEvent::ControllerLost { ip: ip.clone() });
        }
        lost
    }

    /// Current time on the node's clock
    pub fn now(&self) -> DateTime<Utc> {
        self.shared.clock.now()
    }

    pub fn controllers(&self) -> Vec<ControllerRecord> {
        self.shared.controllers.lock().all().to_vec()
    }

    pub fn senders(&self) -> Vec<Sender> {
        self.shared.senders.lock().clone()
    }

    pub fn receivers(&self) -> Vec<Receiver> {
        self.shared.receivers.read().all().to_vec()
    }

    /// Receiver currently bound to a universe
    pub fn receiver(&self, address: UniverseAddress) -> Option<Receiver> {
        self.shared.receivers.read().lookup(address.key()).cloned()
    }

    pub fn interfaces(&self) -> &[InterfaceInfo] {
        &self.shared.interfaces
    }

    /// Stop every sender, end background tasks and release the socket
    pub fn shutdown(&self) {
        self.shared.stop_all();
        info!("Art-Net node shut down");
    }
}

/// Receive errors worth retrying; anything else ends the listener
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    )
}

fn upgrade(weak: &Weak<NodeShared>) -> Option<Node> {
    weak.upgrade().map(|shared| Node { shared })
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("short_name", &self.shared.identity.short_name)
            .field("port", &self.shared.identity.port)
            .field("interfaces", &self.shared.interfaces)
            .field("outbound", &self.shared.outbound)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{encode_dmx, OP_POLL_REPLY};
    use crate::transport::RecordingSink;
    use crate::frame::ChannelFrame;

    fn peer() -> SocketAddr {
        "10.0.0.1:6454".parse().unwrap()
    }

    fn node() -> (Node, Arc<RecordingSink>) {
        let node = Node::with_interfaces(
            &NodeConfig::default(),
            vec![InterfaceInfo::new(
                Ipv4Addr::new(10, 0, 0, 5),
                Ipv4Addr::new(255, 255, 255, 0),
                [2, 0, 0, 0, 0, 1],
            )],
        );
        let sink = RecordingSink::new();
        node.attach_transport(sink.clone());
        (node, sink)
    }

    fn poll(version: u16) -> Vec<u8> {
        PollRequest {
            protocol_version: version,
            ..Default::default()
        }
        .encode()
    }

    #[test]
    fn test_poll_records_controller_and_replies() {
        let (node, sink) = node();
        assert_eq!(node.handle_datagram(&poll(14), peer()), Ok(OpCode::Poll));

        let controllers = node.controllers();
        assert_eq!(controllers.len(), 1);
        assert_eq!(controllers[0].ip, "10.0.0.1");
        assert_eq!(controllers[0].family, "IPv4");
        assert!(controllers[0].alive);

        let replies = sink.sent_with_opcode(OP_POLL_REPLY);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].1, "10.0.0.255:6454".parse().unwrap());
    }

    #[test]
    fn test_old_poll_rejected_without_state_change() {
        let (node, sink) = node();
        assert_eq!(
            node.handle_datagram(&poll(13), peer()),
            Err(FormatError::ProtocolVersion(13))
        );
        assert!(node.controllers().is_empty());
        assert!(sink.sent().is_empty());
    }

    #[test]
    fn test_unsupported_opcode_reported() {
        let (node, _) = node();
        let mut events = node.subscribe();

        let mut packet = poll(14);
        packet[8..10].copy_from_slice(&0x9700u16.to_le_bytes());
        assert_eq!(
            node.handle_datagram(&packet, peer()),
            Err(FormatError::UnsupportedOpCode(0x9700))
        );

        assert!(matches!(
            events.try_recv().unwrap(),
            NodeEvent::PacketReceived { .. }
        ));
        assert_eq!(
            events.try_recv().unwrap(),
            NodeEvent::UnsupportedOpCode {
                from: peer(),
                opcode: 0x9700
            }
        );
    }

    #[test]
    fn test_bad_magic_reported() {
        let (node, _) = node();
        let mut events = node.subscribe();

        assert_eq!(
            node.handle_datagram(b"Art-Nut\0\x00\x50", peer()),
            Err(FormatError::BadMagic)
        );
        events.try_recv().unwrap();
        assert_eq!(
            events.try_recv().unwrap(),
            NodeEvent::FormatError {
                from: peer(),
                error: FormatError::BadMagic
            }
        );
    }

    #[test]
    fn test_unrouted_dmx_is_ignored() {
        let (node, _) = node();
        let receiver = node.create_receiver(&ReceiverOptions::default());

        let mut frame = ChannelFrame::new();
        frame.set(0, 99).unwrap();
        let other = UniverseAddress::new(0, 0, 1).unwrap();
        assert_eq!(
            node.handle_datagram(&encode_dmx(1, other.key(), &frame), peer()),
            Ok(OpCode::Dmx)
        );
        assert_eq!(receiver.values()[0], 0);

        node.handle_datagram(&encode_dmx(1, 0, &frame), peer()).unwrap();
        assert_eq!(receiver.values()[0], 99);
    }

    #[test]
    fn test_poll_reply_is_notification_only() {
        let (node, _) = node();
        let mut events = node.subscribe();

        let info = NodeInfo {
            ip: Ipv4Addr::new(10, 0, 0, 9),
            mac: [0; 6],
            port: 6454,
            oem: 0,
            short_name: "other",
            long_name: "other node",
            report: "",
        };
        let packet = encode_reply(&info, PortBinding::Unbound, 1);
        assert_eq!(node.handle_datagram(&packet, peer()), Ok(OpCode::PollReply));

        events.try_recv().unwrap();
        assert_eq!(
            events.try_recv().unwrap(),
            NodeEvent::PollReplyDetected {
                from: peer(),
                short_name: "other".to_string()
            }
        );
        assert!(node.controllers().is_empty());
    }

    #[test]
    fn test_reply_count_in_report() {
        let (node, sink) = node();
        node.broadcast_reply();
        node.broadcast_reply();

        let replies = sink.sent_with_opcode(OP_POLL_REPLY);
        let first = PollReply::decode(&replies[0].0).unwrap();
        let second = PollReply::decode(&replies[1].0).unwrap();
        assert_eq!(first.report, "#0001 [0000] dmxnet ArtNet-Transceiver running");
        assert_eq!(second.report, "#0001 [0001] dmxnet ArtNet-Transceiver running");
    }

    #[test]
    fn test_no_replies_before_transport() {
        let node = Node::with_interfaces(&NodeConfig::default(), vec![InterfaceInfo::limited_broadcast()]);
        assert_eq!(node.broadcast_reply(), 0);
    }

    #[test]
    fn test_transient_receive_errors() {
        assert!(is_transient(&io::Error::from(io::ErrorKind::ConnectionReset)));
        assert!(is_transient(&io::Error::from(io::ErrorKind::Interrupted)));
        assert!(!is_transient(&io::Error::from(io::ErrorKind::InvalidInput)));
        assert!(!is_transient(&io::Error::from(io::ErrorKind::PermissionDenied)));
    }

    #[test]
    fn test_drop_stops_senders() {
        let (node, sink) = node();
        let sender = node.create_sender(&SenderOptions::default()).unwrap();
        drop(node);

        assert!(sender.is_stopped());
        sink.clear();
        assert!(!sender.transmit().unwrap());
        assert!(sink.sent().is_empty());
    }

    #[test]
    fn test_controller_lost_event() {
        let (node, _) = node();
        node.handle_datagram(&poll(14), peer()).unwrap();
        let mut events = node.subscribe();

        let later = node.now() + chrono::Duration::seconds(61);
        assert_eq!(node.sweep_controllers(later), vec!["10.0.0.1".to_string()]);
        assert!(!node.controllers()[0].alive);
        assert_eq!(
            events.try_recv().unwrap(),
            NodeEvent::ControllerLost {
                ip: "10.0.0.1".to_string()
            }
        );
    }
}
