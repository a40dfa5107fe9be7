//! 512-channel DMX frame

use std::ops::Deref;

use crate::error::ValidationError;

/// Channels per universe
pub const CHANNELS: usize = 512;

/// Dense array of one universe's channel values, all zero by default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelFrame([u8; CHANNELS]);

impl Default for ChannelFrame {
    fn default() -> Self {
        Self([0; CHANNELS])
    }
}

impl ChannelFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8; CHANNELS] {
        &self.0
    }

    /// Value of one channel
    pub fn get(&self, channel: usize) -> Result<u8, ValidationError> {
        check_channel(channel)?;
        Ok(self.0[channel])
    }

    /// Set one channel
    pub fn set(&mut self, channel: usize, value: u8) -> Result<(), ValidationError> {
        check_channel(channel)?;
        self.0[channel] = value;
        Ok(())
    }

    /// Fill the inclusive block `start..=stop`
    pub fn fill(&mut self, start: usize, stop: usize, value: u8) -> Result<(), ValidationError> {
        check_channel(start)?;
        check_channel(stop)?;
        if start > stop {
            return Err(ValidationError::ChannelBlock { start, stop });
        }
        self.0[start..=stop].fill(value);
        Ok(())
    }

    /// Zero every channel
    pub fn clear(&mut self) {
        self.0 = [0; CHANNELS];
    }

    /// Overwrite the leading channels with `data`
    ///
    /// Channels past `data.len()` keep their values. Bytes beyond channel 511
    /// are ignored. Returns the number of channels written.
    pub fn patch(&mut self, data: &[u8]) -> usize {
        let len = data.len().min(CHANNELS);
        self.0[..len].copy_from_slice(&data[..len]);
        len
    }
}

impl Deref for ChannelFrame {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; CHANNELS]> for ChannelFrame {
    fn from(values: [u8; CHANNELS]) -> Self {
        Self(values)
    }
}

fn check_channel(channel: usize) -> Result<(), ValidationError> {
    if channel >= CHANNELS {
        return Err(ValidationError::Channel(channel));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut frame = ChannelFrame::new();
        frame.set(511, 42).unwrap();
        assert_eq!(frame.get(511), Ok(42));
        assert_eq!(frame.set(512, 1), Err(ValidationError::Channel(512)));
        assert_eq!(frame.get(512), Err(ValidationError::Channel(512)));
    }

    #[test]
    fn test_fill_inclusive() {
        let mut frame = ChannelFrame::new();
        frame.fill(10, 19, 7).unwrap();
        assert_eq!(frame[9], 0);
        assert!(frame[10..=19].iter().all(|&v| v == 7));
        assert_eq!(frame[20], 0);
    }

    #[test]
    fn test_fill_rejects_without_mutating() {
        let mut frame = ChannelFrame::new();
        assert!(frame.fill(0, 512, 9).is_err());
        assert!(frame.fill(20, 10, 9).is_err());
        assert_eq!(frame, ChannelFrame::new());
    }

    #[test]
    fn test_patch_keeps_trailing_channels() {
        let mut frame = ChannelFrame::new();
        frame.fill(0, 511, 5).unwrap();

        let written = frame.patch(&[1, 2, 3]);
        assert_eq!(written, 3);
        assert_eq!(&frame[..4], &[1, 2, 3, 5]);
        assert_eq!(frame[511], 5);

        let written = frame.patch(&[9u8; 600]);
        assert_eq!(written, CHANNELS);
        assert!(frame.iter().all(|&v| v == 9));
    }
}
