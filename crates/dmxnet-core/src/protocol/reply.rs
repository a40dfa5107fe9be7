//! ArtPollReply: discovery announcement
//!
//! A node advertises one logical port per reply. Senders appear as input
//! ports (DMX flows from the node into the network), receivers as output
//! ports. A node with neither sends a single reply with an empty port table.

use std::net::Ipv4Addr;

use super::constants::*;
use super::header::{expect_opcode, write_header, OpCode};
use crate::address::UniverseAddress;
use crate::error::FormatError;

/// Identity shared by every reply a node sends on one interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo<'a> {
    pub ip: Ipv4Addr,
    pub mac: [u8; 6],
    pub port: u16,
    pub oem: u16,
    pub short_name: &'a str,
    pub long_name: &'a str,
    pub report: &'a str,
}

/// Port advertised by a single reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortBinding {
    /// A sender
    Input(UniverseAddress),
    /// A receiver
    Output(UniverseAddress),
    /// Node with no ports
    Unbound,
}

/// Decoded or to-be-encoded ArtPollReply fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReply {
    pub ip: Ipv4Addr,
    pub port: u16,
    pub firmware: u16,
    pub net_switch: u8,
    pub subnet_switch: u8,
    pub oem: u16,
    pub ubea: u8,
    pub status1: u8,
    pub esta: u16,
    pub short_name: String,
    pub long_name: String,
    pub report: String,
    pub num_ports: u16,
    pub port_types: [u8; 4],
    pub good_input: [u8; 4],
    pub good_output: [u8; 4],
    pub sw_in: [u8; 4],
    pub sw_out: [u8; 4],
    pub style: u8,
    pub mac: [u8; 6],
    pub bind_ip: Ipv4Addr,
    pub bind_index: u8,
    pub status2: u8,
}

impl PollReply {
    /// Fill the reply for one port of a node
    pub fn new(node: &NodeInfo<'_>, binding: PortBinding, bind_index: u8) -> Self {
        let mut reply = Self {
            ip: node.ip,
            port: node.port,
            firmware: FIRMWARE_VERSION,
            oem: node.oem,
            status1: STATUS1,
            short_name: truncate(node.short_name, SHORT_NAME_MAX).to_string(),
            long_name: truncate(node.long_name, LONG_NAME_MAX).to_string(),
            report: truncate(node.report, REPORT_MAX).to_string(),
            style: STYLE_CONTROLLER,
            mac: node.mac,
            bind_ip: node.ip,
            bind_index,
            status2: STATUS2,
            ..Default::default()
        };

        match binding {
            PortBinding::Input(addr) => {
                reply.net_switch = addr.net();
                reply.subnet_switch = addr.subnet();
                reply.num_ports = 1;
                reply.port_types[0] = PORT_TYPE_INPUT;
                reply.good_input[0] = PORT_GOOD;
                reply.sw_in[0] = addr.universe();
            }
            PortBinding::Output(addr) => {
                reply.net_switch = addr.net();
                reply.subnet_switch = addr.subnet();
                reply.num_ports = 1;
                reply.port_types[0] = PORT_TYPE_OUTPUT;
                reply.good_output[0] = PORT_GOOD;
                reply.sw_out[0] = addr.universe();
            }
            PortBinding::Unbound => {
                reply.net_switch = 0x01;
                reply.subnet_switch = 0x01;
            }
        }
        reply
    }

    /// Serialize to the fixed 239-byte layout
    pub fn encode(&self) -> Vec<u8> {
        let mut packet = vec![0u8; REPLY_LEN];

        write_header(&mut packet, OpCode::PollReply);

        packet[REPLY_IP_OFFSET..REPLY_IP_OFFSET + 4].copy_from_slice(&self.ip.octets());
        // Port is little-endian
        packet[REPLY_PORT_OFFSET..REPLY_PORT_OFFSET + 2].copy_from_slice(&self.port.to_le_bytes());
        packet[REPLY_FIRMWARE_OFFSET..REPLY_FIRMWARE_OFFSET + 2]
            .copy_from_slice(&self.firmware.to_be_bytes());
        packet[REPLY_NET_OFFSET] = self.net_switch;
        packet[REPLY_SUBNET_OFFSET] = self.subnet_switch;
        packet[REPLY_OEM_OFFSET..REPLY_OEM_OFFSET + 2].copy_from_slice(&self.oem.to_be_bytes());
        packet[REPLY_UBEA_OFFSET] = self.ubea;
        packet[REPLY_STATUS1_OFFSET] = self.status1;
        packet[REPLY_ESTA_OFFSET..REPLY_ESTA_OFFSET + 2].copy_from_slice(&self.esta.to_le_bytes());

        write_str(
            &mut packet[REPLY_SHORT_NAME_OFFSET..REPLY_SHORT_NAME_OFFSET + REPLY_SHORT_NAME_LEN],
            &self.short_name,
        );
        write_str(
            &mut packet[REPLY_LONG_NAME_OFFSET..REPLY_LONG_NAME_OFFSET + REPLY_LONG_NAME_LEN],
            &self.long_name,
        );
        write_str(
            &mut packet[REPLY_REPORT_OFFSET..REPLY_REPORT_OFFSET + REPLY_REPORT_LEN],
            &self.report,
        );

        packet[REPLY_NUM_PORTS_OFFSET..REPLY_NUM_PORTS_OFFSET + 2]
            .copy_from_slice(&self.num_ports.to_be_bytes());
        packet[REPLY_PORT_TYPES_OFFSET..REPLY_PORT_TYPES_OFFSET + 4]
            .copy_from_slice(&self.port_types);
        packet[REPLY_GOOD_INPUT_OFFSET..REPLY_GOOD_INPUT_OFFSET + 4]
            .copy_from_slice(&self.good_input);
        packet[REPLY_GOOD_OUTPUT_OFFSET..REPLY_GOOD_OUTPUT_OFFSET + 4]
            .copy_from_slice(&self.good_output);
        packet[REPLY_SW_IN_OFFSET..REPLY_SW_IN_OFFSET + 4].copy_from_slice(&self.sw_in);
        packet[REPLY_SW_OUT_OFFSET..REPLY_SW_OUT_OFFSET + 4].copy_from_slice(&self.sw_out);

        packet[REPLY_STYLE_OFFSET] = self.style;
        packet[REPLY_MAC_OFFSET..REPLY_MAC_OFFSET + 6].copy_from_slice(&self.mac);
        packet[REPLY_BIND_IP_OFFSET..REPLY_BIND_IP_OFFSET + 4]
            .copy_from_slice(&self.bind_ip.octets());
        packet[REPLY_BIND_INDEX_OFFSET] = self.bind_index;
        packet[REPLY_STATUS2_OFFSET] = self.status2;

        packet
    }

    /// Parse an ArtPollReply
    ///
    /// Older nodes send shorter replies; anything that reaches the Status2
    /// byte is accepted.
    pub fn decode(buf: &[u8]) -> Result<Self, FormatError> {
        expect_opcode(buf, OpCode::PollReply)?;
        if buf.len() <= REPLY_STATUS2_OFFSET {
            return Err(FormatError::TooShort(buf.len()));
        }

        Ok(Self {
            ip: read_ipv4(buf, REPLY_IP_OFFSET),
            port: u16::from_le_bytes([buf[REPLY_PORT_OFFSET], buf[REPLY_PORT_OFFSET + 1]]),
            firmware: u16::from_be_bytes([
                buf[REPLY_FIRMWARE_OFFSET],
                buf[REPLY_FIRMWARE_OFFSET + 1],
            ]),
            net_switch: buf[REPLY_NET_OFFSET],
            subnet_switch: buf[REPLY_SUBNET_OFFSET],
            oem: u16::from_be_bytes([buf[REPLY_OEM_OFFSET], buf[REPLY_OEM_OFFSET + 1]]),
            ubea: buf[REPLY_UBEA_OFFSET],
            status1: buf[REPLY_STATUS1_OFFSET],
            esta: u16::from_le_bytes([buf[REPLY_ESTA_OFFSET], buf[REPLY_ESTA_OFFSET + 1]]),
            short_name: read_str(
                &buf[REPLY_SHORT_NAME_OFFSET..REPLY_SHORT_NAME_OFFSET + REPLY_SHORT_NAME_LEN],
            ),
            long_name: read_str(
                &buf[REPLY_LONG_NAME_OFFSET..REPLY_LONG_NAME_OFFSET + REPLY_LONG_NAME_LEN],
            ),
            report: read_str(&buf[REPLY_REPORT_OFFSET..REPLY_REPORT_OFFSET + REPLY_REPORT_LEN]),
            num_ports: u16::from_be_bytes([
                buf[REPLY_NUM_PORTS_OFFSET],
                buf[REPLY_NUM_PORTS_OFFSET + 1],
            ]),
            port_types: read_array(buf, REPLY_PORT_TYPES_OFFSET),
            good_input: read_array(buf, REPLY_GOOD_INPUT_OFFSET),
            good_output: read_array(buf, REPLY_GOOD_OUTPUT_OFFSET),
            sw_in: read_array(buf, REPLY_SW_IN_OFFSET),
            sw_out: read_array(buf, REPLY_SW_OUT_OFFSET),
            style: buf[REPLY_STYLE_OFFSET],
            mac: read_array(buf, REPLY_MAC_OFFSET),
            bind_ip: read_ipv4(buf, REPLY_BIND_IP_OFFSET),
            bind_index: buf[REPLY_BIND_INDEX_OFFSET],
            status2: buf[REPLY_STATUS2_OFFSET],
        })
    }
}

impl Default for PollReply {
    fn default() -> Self {
        Self {
            ip: Ipv4Addr::UNSPECIFIED,
            port: 0,
            firmware: 0,
            net_switch: 0,
            subnet_switch: 0,
            oem: 0,
            ubea: 0,
            status1: 0,
            esta: 0,
            short_name: String::new(),
            long_name: String::new(),
            report: String::new(),
            num_ports: 0,
            port_types: [0; 4],
            good_input: [0; 4],
            good_output: [0; 4],
            sw_in: [0; 4],
            sw_out: [0; 4],
            style: 0,
            mac: [0; 6],
            bind_ip: Ipv4Addr::UNSPECIFIED,
            bind_index: 0,
            status2: 0,
        }
    }
}

/// Encode the reply for one port
pub fn encode_reply(node: &NodeInfo<'_>, binding: PortBinding, bind_index: u8) -> Vec<u8> {
    PollReply::new(node, binding, bind_index).encode()
}

// Node report keeps its terminating null
const REPORT_MAX: usize = REPLY_REPORT_LEN - 1;

/// Longest prefix of `s` within `max` bytes that ends on a char boundary
fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn write_str(field: &mut [u8], s: &str) {
    let bytes = s.as_bytes();
    let len = bytes.len().min(field.len() - 1);
    field[..len].copy_from_slice(&bytes[..len]);
}

fn read_str(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

fn read_array<const N: usize>(buf: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[offset..offset + N]);
    out
}

fn read_ipv4(buf: &[u8], offset: usize) -> Ipv4Addr {
    Ipv4Addr::from(read_array::<4>(buf, offset))
}
