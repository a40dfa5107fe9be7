//! Net / Subnet / Universe addressing
//!
//! Art-Net routes every DMX frame by a 15-bit port address split into three
//! fields. This node packs them into a 16-bit composite key laid out as
//! `(((subnet << 4) | universe) << 8) | net`, which is also the big-endian
//! value found at offset 14 of an ArtDmx packet.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Highest valid Net
pub const MAX_NET: u8 = 127;
/// Highest valid Subnet
pub const MAX_SUBNET: u8 = 15;
/// Highest valid Universe
pub const MAX_UNIVERSE: u8 = 15;

/// Validated (Net, Subnet, Universe) triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "RawAddress", into = "RawAddress")]
pub struct UniverseAddress {
    net: u8,
    subnet: u8,
    universe: u8,
}

impl UniverseAddress {
    /// Create an address, rejecting any field outside its range
    pub fn new(net: u8, subnet: u8, universe: u8) -> Result<Self, ValidationError> {
        if net > MAX_NET {
            return Err(ValidationError::Net(net));
        }
        if subnet > MAX_SUBNET {
            return Err(ValidationError::Subnet(subnet));
        }
        if universe > MAX_UNIVERSE {
            return Err(ValidationError::Universe(universe));
        }
        Ok(Self {
            net,
            subnet,
            universe,
        })
    }

    /// Create an address from a Net and an explicit SubUni byte
    ///
    /// The high nibble of `subuni` is the subnet, the low nibble the universe.
    pub fn with_subuni(net: u8, subuni: u8) -> Result<Self, ValidationError> {
        Self::new(net, subuni >> 4, subuni & 0x0F)
    }

    /// Rebuild an address from its composite key
    pub fn from_key(key: u16) -> Result<Self, ValidationError> {
        let [subuni, net] = key.to_be_bytes();
        Self::with_subuni(net, subuni)
    }

    pub fn net(&self) -> u8 {
        self.net
    }

    pub fn subnet(&self) -> u8 {
        self.subnet
    }

    pub fn universe(&self) -> u8 {
        self.universe
    }

    /// `(subnet << 4) | universe`
    pub fn subuni(&self) -> u8 {
        (self.subnet << 4) | self.universe
    }

    /// 16-bit routing key
    ///
    /// Two addresses route to the same receiver iff their keys are equal.
    pub fn key(&self) -> u16 {
        u16::from_be_bytes([self.subuni(), self.net])
    }
}

impl fmt::Display for UniverseAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{} (0x{:04x})",
            self.net,
            self.subnet,
            self.universe,
            self.key()
        )
    }
}

/// Serialized shape: plain fields plus an optional SubUni override
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
struct RawAddress {
    net: u8,
    subnet: u8,
    universe: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    subuni: Option<u8>,
}

impl TryFrom<RawAddress> for UniverseAddress {
    type Error = ValidationError;

    fn try_from(raw: RawAddress) -> Result<Self, Self::Error> {
        match raw.subuni {
            Some(subuni) => Self::with_subuni(raw.net, subuni),
            None => Self::new(raw.net, raw.subnet, raw.universe),
        }
    }
}

impl From<UniverseAddress> for RawAddress {
    fn from(addr: UniverseAddress) -> Self {
        Self {
            net: addr.net,
            subnet: addr.subnet,
            universe: addr.universe,
            subuni: None,
        }
    }
}
