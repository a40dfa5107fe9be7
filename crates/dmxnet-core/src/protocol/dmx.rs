//! ArtDmx: channel data for one universe

use super::constants::*;
use super::header::{expect_opcode, write_header, OpCode};
use crate::error::FormatError;
use crate::frame::{ChannelFrame, CHANNELS};

/// Build an outbound ArtDmx packet
///
/// The packet always carries the full 512 channels.
pub fn encode_dmx(sequence: u8, key: u16, channels: &ChannelFrame) -> Vec<u8> {
    let mut packet = vec![0u8; DMX_PACKET_LEN];

    write_header(&mut packet, OpCode::Dmx);

    // Protocol version (14)
    packet[VERSION_OFFSET..VERSION_OFFSET + 2].copy_from_slice(&PROTOCOL_VERSION.to_be_bytes());

    packet[DMX_SEQUENCE_OFFSET] = sequence;

    // Physical port
    packet[DMX_PHYSICAL_OFFSET] = 0;

    // SubUni then Net
    packet[DMX_KEY_OFFSET..DMX_KEY_OFFSET + 2].copy_from_slice(&key.to_be_bytes());

    // Length (512 channels, big-endian)
    packet[DMX_LENGTH_OFFSET..DMX_LENGTH_OFFSET + 2]
        .copy_from_slice(&(CHANNELS as u16).to_be_bytes());

    packet[DMX_DATA_OFFSET..].copy_from_slice(channels.as_bytes());

    packet
}

/// Inbound channel data borrowed from the datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmxFrame<'a> {
    pub sequence: u8,
    pub physical: u8,
    pub key: u16,
    /// Channel bytes from offset 18 to the end of the datagram, at most 512
    pub channels: &'a [u8],
}

/// Decode an ArtDmx packet
///
/// The length field is not trusted; whatever follows the header is taken
/// as the leading channels of the universe.
pub fn decode_dmx(buf: &[u8]) -> Result<DmxFrame<'_>, FormatError> {
    expect_opcode(buf, OpCode::Dmx)?;
    if buf.len() < DMX_DATA_OFFSET {
        return Err(FormatError::TooShort(buf.len()));
    }

    let data = &buf[DMX_DATA_OFFSET..];
    Ok(DmxFrame {
        sequence: buf[DMX_SEQUENCE_OFFSET],
        physical: buf[DMX_PHYSICAL_OFFSET],
        key: u16::from_be_bytes([buf[DMX_KEY_OFFSET], buf[DMX_KEY_OFFSET + 1]]),
        channels: &data[..data.len().min(CHANNELS)],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dmx_packet_structure() {
        let mut channels = ChannelFrame::new();
        channels.set(0, 128).unwrap();
        channels.set(511, 1).unwrap();

        let packet = encode_dmx(7, 0x3412, &channels);

        // Check header
        assert_eq!(&packet[0..8], b"Art-Net\0");

        // Check OpCode (little-endian)
        assert_eq!(packet[8], 0x00);
        assert_eq!(packet[9], 0x50);

        // Check protocol version (big-endian)
        assert_eq!(packet[10], 0);
        assert_eq!(packet[11], 14);

        assert_eq!(packet[12], 7);
        assert_eq!(packet[13], 0);

        // SubUni, Net
        assert_eq!(packet[14], 0x34);
        assert_eq!(packet[15], 0x12);

        // Check length (big-endian)
        assert_eq!(packet[16], 0x02);
        assert_eq!(packet[17], 0x00);

        assert_eq!(packet[18], 128);
        assert_eq!(packet[18 + 511], 1);
        assert_eq!(packet.len(), 18 + 512);
    }

    #[test]
    fn test_decode_full_frame() {
        let mut channels = ChannelFrame::new();
        channels.fill(100, 199, 33).unwrap();

        let packet = encode_dmx(200, 0x0105, &channels);
        let frame = decode_dmx(&packet).unwrap();

        assert_eq!(frame.sequence, 200);
        assert_eq!(frame.physical, 0);
        assert_eq!(frame.key, 0x0105);
        assert_eq!(frame.channels, channels.as_bytes());
    }

    #[test]
    fn test_decode_partial_frame() {
        let mut packet = encode_dmx(1, 0, &ChannelFrame::new());
        packet.truncate(18 + 24);
        packet[18] = 255;

        let frame = decode_dmx(&packet).unwrap();
        assert_eq!(frame.channels.len(), 24);
        assert_eq!(frame.channels[0], 255);
    }

    #[test]
    fn test_decode_header_only() {
        let packet = encode_dmx(1, 0, &ChannelFrame::new());
        let frame = decode_dmx(&packet[..18]).unwrap();
        assert!(frame.channels.is_empty());

        assert_eq!(decode_dmx(&packet[..16]), Err(FormatError::TooShort(16)));
    }

    #[test]
    fn test_oversized_payload_capped() {
        let mut packet = encode_dmx(1, 0, &ChannelFrame::new());
        packet.extend_from_slice(&[9; 40]);
        let frame = decode_dmx(&packet).unwrap();
        assert_eq!(frame.channels.len(), 512);
    }
}
