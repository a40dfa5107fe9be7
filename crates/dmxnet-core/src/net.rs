//! Local interface description and IPv4 helpers
//!
//! Enumerating interfaces is left to the caller; the node only needs the
//! values below for each IPv4 interface it advertises on.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One local IPv4 interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub ip: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub mac: [u8; 6],
    pub broadcast: Ipv4Addr,
}

impl InterfaceInfo {
    /// Describe an interface, deriving its directed broadcast address
    pub fn new(ip: Ipv4Addr, netmask: Ipv4Addr, mac: [u8; 6]) -> Self {
        let broadcast = Ipv4Addr::from(u32::from(ip) | !u32::from(netmask));
        Self {
            ip,
            netmask,
            mac,
            broadcast,
        }
    }

    /// Fallback used when no interface is configured
    pub fn limited_broadcast() -> Self {
        Self {
            ip: Ipv4Addr::UNSPECIFIED,
            netmask: Ipv4Addr::UNSPECIFIED,
            mac: [0; 6],
            broadcast: Ipv4Addr::BROADCAST,
        }
    }
}

/// Interface as written in a configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceConfig {
    pub ip: Ipv4Addr,
    pub netmask: Ipv4Addr,
    /// `aa:bb:cc:dd:ee:ff`
    #[serde(default = "default_mac")]
    pub mac: String,
}

fn default_mac() -> String {
    "00:00:00:00:00:00".to_string()
}

impl TryFrom<&InterfaceConfig> for InterfaceInfo {
    type Error = ValidationError;

    fn try_from(config: &InterfaceConfig) -> Result<Self, Self::Error> {
        Ok(Self::new(config.ip, config.netmask, parse_mac(&config.mac)?))
    }
}

/// Parse a colon separated MAC address
pub fn parse_mac(mac: &str) -> Result<[u8; 6], ValidationError> {
    let parts: Vec<&str> = mac.split(':').collect();
    if parts.len() != 6 || parts.iter().any(|p| p.len() != 2) {
        return Err(ValidationError::Mac(mac.to_string()));
    }
    let bytes = hex::decode(parts.concat()).map_err(|_| ValidationError::Mac(mac.to_string()))?;

    let mut out = [0u8; 6];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Parse a dotted IPv4 string octet by octet
pub fn parse_ipv4(address: &str) -> Result<Ipv4Addr, ValidationError> {
    let parts: Vec<&str> = address.split('.').collect();
    if parts.len() != 4 {
        return Err(ValidationError::Ipv4Length(address.to_string()));
    }

    let mut octets = [0u8; 4];
    for (i, part) in parts.iter().enumerate() {
        octets[i] = part
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(|v| u8::try_from(v).ok())
            .ok_or_else(|| ValidationError::Ipv4Octet {
                address: address.to_string(),
                octet: i + 1,
            })?;
    }
    Ok(Ipv4Addr::from(octets))
}

/// Whether a destination string is a broadcast address
///
/// Any address whose last octet is 255 counts, which includes the limited
/// broadcast `255.255.255.255`.
pub fn is_broadcast(address: &str) -> Result<bool, ValidationError> {
    let ip = parse_ipv4(address)?;
    Ok(ip.octets()[3] == 255)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_broadcast() {
        assert_eq!(is_broadcast("255.255.255.255"), Ok(true));
        assert_eq!(is_broadcast("192.168.0.255"), Ok(true));
        assert_eq!(is_broadcast("10.7.240.66"), Ok(false));
    }

    #[test]
    fn test_is_broadcast_malformed() {
        assert!(matches!(
            is_broadcast("10.7.240"),
            Err(ValidationError::Ipv4Length(_))
        ));
        assert!(matches!(
            is_broadcast("10.7.240.66.1"),
            Err(ValidationError::Ipv4Length(_))
        ));
        assert!(matches!(
            is_broadcast("10.256.0.1"),
            Err(ValidationError::Ipv4Octet { octet: 2, .. })
        ));
        assert!(matches!(
            is_broadcast("10.0.-1.1"),
            Err(ValidationError::Ipv4Octet { octet: 3, .. })
        ));
        assert!(is_broadcast("a.b.c.d").is_err());
    }

    #[test]
    fn test_interface_broadcast() {
        let iface = InterfaceInfo::new(
            Ipv4Addr::new(192, 168, 1, 20),
            Ipv4Addr::new(255, 255, 255, 0),
            [0; 6],
        );
        assert_eq!(iface.broadcast, Ipv4Addr::new(192, 168, 1, 255));

        let iface = InterfaceInfo::new(
            Ipv4Addr::new(2, 0, 0, 7),
            Ipv4Addr::new(255, 0, 0, 0),
            [0; 6],
        );
        assert_eq!(iface.broadcast, Ipv4Addr::new(2, 255, 255, 255));
    }

    #[test]
    fn test_parse_mac() {
        assert_eq!(
            parse_mac("de:ad:be:ef:00:0A"),
            Ok([0xde, 0xad, 0xbe, 0xef, 0x00, 0x0a])
        );
        assert!(parse_mac("de:ad:be:ef:00").is_err());
        assert!(parse_mac("zz:ad:be:ef:00:01").is_err());
    }
}
