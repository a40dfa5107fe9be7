//! Error types for the Art-Net node
use thiserror::Error;

/// Construction-time validation failures
///
/// Raised synchronously by the call that received the bad value. Values are
/// never clamped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Net outside 0..=127
    #[error("Invalid Net {0}, must be smaller than 128")]
    Net(u8),

    /// Subnet outside 0..=15
    #[error("Invalid Subnet {0}, must be smaller than 16")]
    Subnet(u8),

    /// Universe outside 0..=15
    #[error("Invalid Universe {0}, must be smaller than 16")]
    Universe(u8),

    /// Channel outside 0..=511
    #[error("Channel {0} out of range, must be between 0 and 511")]
    Channel(usize),

    /// Channel block whose start lies after its stop
    #[error("Channel block {start}..={stop} is empty")]
    ChannelBlock { start: usize, stop: usize },

    /// IPv4 string that does not have exactly four octets
    #[error("Wrong IPv4 length: {0}")]
    Ipv4Length(String),

    /// IPv4 octet that is not a number in 0..=255
    #[error("Invalid IP (Octet {octet}): {address}")]
    Ipv4Octet { address: String, octet: usize },

    /// MAC address that is not six colon separated hex bytes
    #[error("Invalid MAC address: {0}")]
    Mac(String),

    /// Sender refresh interval of zero
    #[error("Refresh interval must be greater than zero")]
    RefreshInterval,
}

/// Malformed inbound datagrams
///
/// Non-fatal: the packet is dropped and the node keeps running.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Datagram shorter than the fixed header
    #[error("Payload too short ({0} bytes)")]
    TooShort(usize),

    /// First eight bytes are not `Art-Net\0`
    #[error("Invalid header (bad magic)")]
    BadMagic,

    /// Opcode field is zero
    #[error("Invalid header (missing opcode)")]
    MissingOpCode,

    /// ArtPoll shorter than 14 bytes
    #[error("ArtPoll too small ({0} bytes)")]
    PollTooSmall(usize),

    /// Protocol version below 14
    #[error("Unsupported protocol version {0}")]
    ProtocolVersion(u16),

    /// Opcode this node does not implement
    #[error("OpCode {0:#06x} not implemented")]
    UnsupportedOpCode(u16),

    /// Opcode valid, but not the one the decoder expects
    #[error("Unexpected OpCode {found:#06x}, expected {expected:#06x}")]
    UnexpectedOpCode { expected: u16, found: u16 },
}

/// Node errors
#[derive(Error, Debug)]
pub enum DmxnetError {
    /// Invalid parameter value
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Malformed packet
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Send or bind failure
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(String),

    /// TOML configuration could not be parsed
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON configuration could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for node operations
pub type Result<T> = std::result::Result<T, DmxnetError>;
