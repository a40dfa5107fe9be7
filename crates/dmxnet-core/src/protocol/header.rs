//! Common Art-Net header

use super::constants::*;
use crate::error::FormatError;

/// Opcodes this node understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// ArtPoll (0x2000)
    Poll,
    /// ArtPollReply (0x2100)
    PollReply,
    /// ArtDmx (0x5000)
    Dmx,
    /// Anything else
    Other(u16),
}

impl OpCode {
    pub fn value(self) -> u16 {
        match self {
            OpCode::Poll => OP_POLL,
            OpCode::PollReply => OP_POLL_REPLY,
            OpCode::Dmx => OP_DMX,
            OpCode::Other(v) => v,
        }
    }
}

impl From<u16> for OpCode {
    fn from(value: u16) -> Self {
        match value {
            OP_POLL => OpCode::Poll,
            OP_POLL_REPLY => OpCode::PollReply,
            OP_DMX => OpCode::Dmx,
            other => OpCode::Other(other),
        }
    }
}

/// Validate the identifier and return the opcode
pub fn decode_header(buf: &[u8]) -> Result<OpCode, FormatError> {
    if buf.len() < HEADER_LEN {
        return Err(FormatError::TooShort(buf.len()));
    }
    if &buf[ID_OFFSET..ID_OFFSET + 8] != ARTNET_ID {
        return Err(FormatError::BadMagic);
    }

    // OpCode is little-endian
    let opcode = u16::from_le_bytes([buf[OPCODE_OFFSET], buf[OPCODE_OFFSET + 1]]);
    if opcode == 0 {
        return Err(FormatError::MissingOpCode);
    }
    Ok(OpCode::from(opcode))
}

/// Write identifier and opcode into the first ten bytes of `packet`
pub(crate) fn write_header(packet: &mut [u8], opcode: OpCode) {
    packet[ID_OFFSET..ID_OFFSET + 8].copy_from_slice(ARTNET_ID);
    packet[OPCODE_OFFSET..OPCODE_OFFSET + 2].copy_from_slice(&opcode.value().to_le_bytes());
}

/// Protocol version at offset 10 (big-endian)
pub(crate) fn read_version(buf: &[u8]) -> u16 {
    u16::from_be_bytes([buf[VERSION_OFFSET], buf[VERSION_OFFSET + 1]])
}

pub(crate) fn expect_opcode(buf: &[u8], expected: OpCode) -> Result<(), FormatError> {
    let found = decode_header(buf)?;
    if found != expected {
        return Err(FormatError::UnexpectedOpCode {
            expected: expected.value(),
            found: found.value(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(opcode: u16) -> Vec<u8> {
        let mut buf = vec![0u8; 12];
        buf[..8].copy_from_slice(ARTNET_ID);
        buf[8..10].copy_from_slice(&opcode.to_le_bytes());
        buf
    }

    #[test]
    fn test_decode_opcodes() {
        assert_eq!(decode_header(&header(0x5000)), Ok(OpCode::Dmx));
        assert_eq!(decode_header(&header(0x2000)), Ok(OpCode::Poll));
        assert_eq!(decode_header(&header(0x2100)), Ok(OpCode::PollReply));
        assert_eq!(decode_header(&header(0x9700)), Ok(OpCode::Other(0x9700)));
    }

    #[test]
    fn test_opcode_byte_order() {
        let buf = header(0x5000);
        assert_eq!(buf[8], 0x00);
        assert_eq!(buf[9], 0x50);
    }

    #[test]
    fn test_too_short() {
        assert_eq!(decode_header(&[0u8; 9]), Err(FormatError::TooShort(9)));
    }

    #[test]
    fn test_bad_magic() {
        let mut buf = header(0x5000);
        buf[7] = b'!';
        assert_eq!(decode_header(&buf), Err(FormatError::BadMagic));

        let mut buf = header(0x5000);
        buf[0] = b'a';
        assert_eq!(decode_header(&buf), Err(FormatError::BadMagic));
    }

    #[test]
    fn test_missing_opcode() {
        assert_eq!(decode_header(&header(0)), Err(FormatError::MissingOpCode));
    }
}
