//! DMX receivers
//!
//! A receiver holds the last channel state seen for one universe. The node
//! looks receivers up by composite key whenever an ArtDmx arrives.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::address::UniverseAddress;
use crate::frame::ChannelFrame;

/// Configuration for a receiver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverOptions {
    #[serde(flatten)]
    pub address: UniverseAddress,
}

/// Passive listener for one universe
#[derive(Debug, Clone)]
pub struct Receiver {
    inner: Arc<ReceiverInner>,
}

#[derive(Debug)]
struct ReceiverInner {
    address: UniverseAddress,
    frame: watch::Sender<ChannelFrame>,
}

impl Receiver {
    pub fn new(address: UniverseAddress) -> Self {
        let (frame, _) = watch::channel(ChannelFrame::default());
        Self {
            inner: Arc::new(ReceiverInner { address, frame }),
        }
    }

    pub fn address(&self) -> UniverseAddress {
        self.inner.address
    }

    pub fn key(&self) -> u16 {
        self.inner.address.key()
    }

    /// Apply received channel data and notify subscribers
    ///
    /// `channels` may be shorter than 512; channels it does not cover keep
    /// their previous values.
    pub fn apply(&self, channels: &[u8]) {
        self.inner.frame.send_modify(|frame| {
            frame.patch(channels);
        });
    }

    /// Snapshot of the current channel values
    pub fn values(&self) -> ChannelFrame {
        *self.inner.frame.borrow()
    }

    /// Watch the frame; every `apply` marks it changed
    pub fn subscribe(&self) -> watch::Receiver<ChannelFrame> {
        self.inner.frame.subscribe()
    }

    /// Whether two handles refer to the same receiver
    pub fn ptr_eq(&self, other: &Receiver) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Receivers owned by a node
///
/// Every receiver stays listed; the lookup table maps each key to the most
/// recently registered receiver for it.
#[derive(Debug, Default)]
pub struct ReceiverRegistry {
    all: Vec<Receiver>,
    by_key: HashMap<u16, Receiver>,
}

impl ReceiverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, receiver: Receiver) {
        self.by_key.insert(receiver.key(), receiver.clone());
        self.all.push(receiver);
    }

    pub fn lookup(&self, key: u16) -> Option<&Receiver> {
        self.by_key.get(&key)
    }

    pub fn all(&self) -> &[Receiver] {
        &self.all
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_patches_leading_channels() {
        let receiver = Receiver::new(UniverseAddress::default());
        receiver.apply(&[10; 512]);
        receiver.apply(&[1, 2]);

        let values = receiver.values();
        assert_eq!(&values[..3], &[1, 2, 10]);
        assert_eq!(values[511], 10);
    }

    #[tokio::test]
    async fn test_subscribers_see_updates() {
        let receiver = Receiver::new(UniverseAddress::default());
        let mut rx = receiver.subscribe();

        receiver.apply(&[200]);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update()[0], 200);
    }

    #[test]
    fn test_later_registration_wins_lookup() {
        let addr = UniverseAddress::new(1, 2, 3).unwrap();
        let first = Receiver::new(addr);
        let second = Receiver::new(addr);

        let mut registry = ReceiverRegistry::new();
        registry.register(first.clone());
        registry.register(second.clone());

        assert_eq!(registry.len(), 2);
        assert!(registry.lookup(addr.key()).unwrap().ptr_eq(&second));
        assert!(registry.lookup(0).is_none());

        first.apply(&[7]);
        assert_eq!(first.values()[0], 7);
        assert_eq!(second.values()[0], 0);
    }
}
