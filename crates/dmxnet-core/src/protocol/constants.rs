//! Art-Net wire constants and field offsets

/// Packet identifier: "Art-Net" followed by a null terminator
pub const ARTNET_ID: &[u8; 8] = b"Art-Net\0";

/// Default UDP port
pub const ARTNET_PORT: u16 = 6454;

/// Protocol revision written into every packet
pub const PROTOCOL_VERSION: u16 = 14;

pub const OP_POLL: u16 = 0x2000;
pub const OP_POLL_REPLY: u16 = 0x2100;
pub const OP_DMX: u16 = 0x5000;

// Common header
pub const ID_OFFSET: usize = 0;
pub const OPCODE_OFFSET: usize = 8;
pub const VERSION_OFFSET: usize = 10;
pub const HEADER_LEN: usize = 10;

// ArtPoll
pub const POLL_TALK_TO_ME_OFFSET: usize = 12;
pub const POLL_PRIORITY_OFFSET: usize = 13;
pub const POLL_MIN_LEN: usize = 14;

pub const TTM_DIAGNOSTIC_UNICAST: u8 = 0b0000_1000;
pub const TTM_DIAGNOSTIC_ENABLE: u8 = 0b0000_0100;
pub const TTM_UNILATERAL: u8 = 0b0000_0010;

// ArtDmx
pub const DMX_SEQUENCE_OFFSET: usize = 12;
pub const DMX_PHYSICAL_OFFSET: usize = 13;
pub const DMX_KEY_OFFSET: usize = 14;
pub const DMX_LENGTH_OFFSET: usize = 16;
pub const DMX_DATA_OFFSET: usize = 18;
pub const DMX_PACKET_LEN: usize = DMX_DATA_OFFSET + crate::frame::CHANNELS;

// ArtPollReply
pub const REPLY_LEN: usize = 239;
pub const REPLY_IP_OFFSET: usize = 10;
pub const REPLY_PORT_OFFSET: usize = 14;
pub const REPLY_FIRMWARE_OFFSET: usize = 16;
pub const REPLY_NET_OFFSET: usize = 18;
pub const REPLY_SUBNET_OFFSET: usize = 19;
pub const REPLY_OEM_OFFSET: usize = 20;
pub const REPLY_UBEA_OFFSET: usize = 22;
pub const REPLY_STATUS1_OFFSET: usize = 23;
pub const REPLY_ESTA_OFFSET: usize = 24;
pub const REPLY_SHORT_NAME_OFFSET: usize = 26;
pub const REPLY_SHORT_NAME_LEN: usize = 18;
pub const REPLY_LONG_NAME_OFFSET: usize = 44;
pub const REPLY_LONG_NAME_LEN: usize = 64;
pub const REPLY_REPORT_OFFSET: usize = 108;
pub const REPLY_REPORT_LEN: usize = 64;
pub const REPLY_NUM_PORTS_OFFSET: usize = 172;
pub const REPLY_PORT_TYPES_OFFSET: usize = 174;
pub const REPLY_GOOD_INPUT_OFFSET: usize = 178;
pub const REPLY_GOOD_OUTPUT_OFFSET: usize = 182;
pub const REPLY_SW_IN_OFFSET: usize = 186;
pub const REPLY_SW_OUT_OFFSET: usize = 190;
pub const REPLY_STYLE_OFFSET: usize = 200;
pub const REPLY_MAC_OFFSET: usize = 201;
pub const REPLY_BIND_IP_OFFSET: usize = 207;
pub const REPLY_BIND_INDEX_OFFSET: usize = 211;
pub const REPLY_STATUS2_OFFSET: usize = 212;

/// Longest short name copied into a reply
pub const SHORT_NAME_MAX: usize = 16;
/// Longest long name copied into a reply
pub const LONG_NAME_MAX: usize = 63;

pub const FIRMWARE_VERSION: u16 = 0x0001;
pub const STATUS1: u8 = 0b1101_0000;
pub const STATUS2: u8 = 0b0000_1110;
pub const STYLE_CONTROLLER: u8 = 0x01;

pub const PORT_TYPE_INPUT: u8 = 0b0100_0000;
pub const PORT_TYPE_OUTPUT: u8 = 0b1000_0000;
pub const PORT_GOOD: u8 = 0b1000_0000;
