//! Outbound datagram transport
//!
//! The engine never touches sockets directly. Everything it sends goes through
//! a [`DatagramSink`] held in a shared [`Outbound`] slot, which stays empty
//! until the node's socket is bound.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::RwLock;

/// Anything that can fire a datagram at an address without blocking
pub trait DatagramSink: Send + Sync {
    fn send_datagram(&self, payload: &[u8], target: SocketAddr) -> io::Result<usize>;
}

impl DatagramSink for tokio::net::UdpSocket {
    fn send_datagram(&self, payload: &[u8], target: SocketAddr) -> io::Result<usize> {
        self.try_send_to(payload, target)
    }
}

impl DatagramSink for std::net::UdpSocket {
    fn send_datagram(&self, payload: &[u8], target: SocketAddr) -> io::Result<usize> {
        self.send_to(payload, target)
    }
}

/// Shared handle to the node's outbound socket
#[derive(Clone, Default)]
pub struct Outbound {
    sink: Arc<RwLock<Option<Arc<dyn DatagramSink>>>>,
}

impl Outbound {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the socket every sender and reply writes through
    pub fn attach(&self, sink: Arc<dyn DatagramSink>) {
        *self.sink.write() = Some(sink);
    }

    /// Drop the socket; later sends become no-ops
    pub fn detach(&self) {
        *self.sink.write() = None;
    }

    pub fn is_ready(&self) -> bool {
        self.sink.read().is_some()
    }

    /// Send one datagram
    ///
    /// Returns `Ok(false)` without sending while no socket is attached.
    pub fn send(&self, payload: &[u8], target: SocketAddr) -> io::Result<bool> {
        let sink = match self.sink.read().as_ref() {
            Some(sink) => Arc::clone(sink),
            None => return Ok(false),
        };
        sink.send_datagram(payload, target)?;
        Ok(true)
    }
}

impl std::fmt::Debug for Outbound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outbound")
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Sink that keeps every datagram in memory
#[derive(Default)]
pub struct RecordingSink {
    sent: parking_lot::Mutex<Vec<(Vec<u8>, SocketAddr)>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Everything sent so far, oldest first
    pub fn sent(&self) -> Vec<(Vec<u8>, SocketAddr)> {
        self.sent.lock().clone()
    }

    /// Sent datagrams carrying `opcode`
    pub fn sent_with_opcode(&self, opcode: u16) -> Vec<(Vec<u8>, SocketAddr)> {
        self.sent
            .lock()
            .iter()
            .filter(|(payload, _)| {
                crate::protocol::decode_header(payload).map(|op| op.value()) == Ok(opcode)
            })
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

impl DatagramSink for RecordingSink {
    fn send_datagram(&self, payload: &[u8], target: SocketAddr) -> io::Result<usize> {
        self.sent.lock().push((payload.to_vec(), target));
        Ok(payload.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_before_attach_is_noop() {
        let outbound = Outbound::new();
        assert!(!outbound.is_ready());
        assert!(!outbound.send(b"x", "127.0.0.1:6454".parse().unwrap()).unwrap());
    }

    #[test]
    fn test_send_through_attached_sink() {
        let outbound = Outbound::new();
        let sink = RecordingSink::new();
        outbound.attach(sink.clone());

        let target: SocketAddr = "10.0.0.255:6454".parse().unwrap();
        assert!(outbound.send(b"hello", target).unwrap());
        assert_eq!(sink.sent(), vec![(b"hello".to_vec(), target)]);

        outbound.detach();
        assert!(!outbound.send(b"again", target).unwrap());
        assert_eq!(sink.sent().len(), 1);
    }

    #[test]
    fn test_std_socket_sink() {
        let rx = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let tx = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();

        let outbound = Outbound::new();
        outbound.attach(Arc::new(tx));
        outbound.send(b"ping", rx.local_addr().unwrap()).unwrap();

        let mut buf = [0u8; 16];
        let (len, _) = rx.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..len], b"ping");
    }
}
