//! ArtPoll: discovery request

use super::constants::*;
use super::header::{expect_opcode, read_version, write_header, OpCode};
use crate::error::FormatError;

/// Decoded discovery poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollRequest {
    pub protocol_version: u16,
    /// Send diagnostics unicast instead of broadcast
    pub diagnostic_unicast: bool,
    /// Controller wants diagnostic messages
    pub diagnostic_enabled: bool,
    /// Send replies whenever node conditions change
    pub unilateral: bool,
    /// Lowest diagnostic priority the controller wants
    pub priority: u8,
}

impl PollRequest {
    /// Decode an ArtPoll
    ///
    /// Requires at least 14 bytes and protocol version 14 or newer.
    pub fn decode(buf: &[u8]) -> Result<Self, FormatError> {
        expect_opcode(buf, OpCode::Poll)?;
        if buf.len() < POLL_MIN_LEN {
            return Err(FormatError::PollTooSmall(buf.len()));
        }

        let protocol_version = read_version(buf);
        if protocol_version < PROTOCOL_VERSION {
            return Err(FormatError::ProtocolVersion(protocol_version));
        }

        let talk_to_me = buf[POLL_TALK_TO_ME_OFFSET];
        Ok(Self {
            protocol_version,
            diagnostic_unicast: talk_to_me & TTM_DIAGNOSTIC_UNICAST != 0,
            diagnostic_enabled: talk_to_me & TTM_DIAGNOSTIC_ENABLE != 0,
            unilateral: talk_to_me & TTM_UNILATERAL != 0,
            priority: buf[POLL_PRIORITY_OFFSET],
        })
    }

    /// Build a 14-byte ArtPoll
    pub fn encode(&self) -> Vec<u8> {
        let mut packet = vec![0u8; POLL_MIN_LEN];
        write_header(&mut packet, OpCode::Poll);
        packet[VERSION_OFFSET..VERSION_OFFSET + 2]
            .copy_from_slice(&self.protocol_version.to_be_bytes());

        let mut talk_to_me = 0;
        if self.diagnostic_unicast {
            talk_to_me |= TTM_DIAGNOSTIC_UNICAST;
        }
        if self.diagnostic_enabled {
            talk_to_me |= TTM_DIAGNOSTIC_ENABLE;
        }
        if self.unilateral {
            talk_to_me |= TTM_UNILATERAL;
        }
        packet[POLL_TALK_TO_ME_OFFSET] = talk_to_me;
        packet[POLL_PRIORITY_OFFSET] = self.priority;
        packet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_poll(version: [u8; 2], talk_to_me: u8, priority: u8) -> Vec<u8> {
        let mut buf = Vec::from(&ARTNET_ID[..]);
        buf.extend_from_slice(&[0x00, 0x20]);
        buf.extend_from_slice(&version);
        buf.push(talk_to_me);
        buf.push(priority);
        buf
    }

    #[test]
    fn test_talk_to_me_flags() {
        let poll = PollRequest::decode(&raw_poll([0, 14], 0b0000_1010, 0x40)).unwrap();
        assert_eq!(poll.protocol_version, 14);
        assert!(poll.diagnostic_unicast);
        assert!(!poll.diagnostic_enabled);
        assert!(poll.unilateral);
        assert_eq!(poll.priority, 0x40);

        let poll = PollRequest::decode(&raw_poll([0, 14], 0b0000_0100, 0)).unwrap();
        assert!(!poll.diagnostic_unicast);
        assert!(poll.diagnostic_enabled);
        assert!(!poll.unilateral);
    }

    #[test]
    fn test_old_protocol_rejected() {
        assert_eq!(
            PollRequest::decode(&raw_poll([0, 13], 0, 0)),
            Err(FormatError::ProtocolVersion(13))
        );
    }

    #[test]
    fn test_undersized_poll_rejected() {
        let buf = raw_poll([0, 14], 0, 0);
        assert_eq!(
            PollRequest::decode(&buf[..13]),
            Err(FormatError::PollTooSmall(13))
        );
    }

    #[test]
    fn test_wrong_opcode() {
        let mut buf = raw_poll([0, 14], 0, 0);
        buf[9] = 0x50;
        assert!(matches!(
            PollRequest::decode(&buf),
            Err(FormatError::UnexpectedOpCode { .. })
        ));
    }

    #[test]
    fn test_encode_matches_raw_layout() {
        let poll = PollRequest {
            protocol_version: 14,
            diagnostic_unicast: true,
            diagnostic_enabled: true,
            unilateral: true,
            priority: 0x80,
        };
        assert_eq!(poll.encode(), raw_poll([0, 14], 0b0000_1110, 0x80));
        assert_eq!(PollRequest::decode(&poll.encode()), Ok(poll));
    }
}
