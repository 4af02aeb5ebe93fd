//! Debug channel payloads: ConfigChannel, Decimation, ResetTime, ReadChannelData

use alloc::vec::Vec;

use super::{read_u32, CommandPayload, PayloadError};
use crate::command::Command;
use crate::types::ChannelMode;

/// Number of debug channels a node supports
pub const MAX_DEBUG_CHANNELS: u8 = 16;

/// Channel, mode, offset, control and size
const FULL_CONFIG_LEN: usize = 8;

/// Timestamp (3 bytes) plus channel mask (2 bytes)
const CHANNEL_DATA_HEADER_LEN: usize = 5;

/// Largest timestamp representable in three bytes
const TIMESTAMP_MASK: u32 = 0x00FF_FFFF;

/// Register bound to a debug channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelRegister {
    /// Register offset
    pub offset: u32,
    /// Control byte
    pub control: u8,
    /// Register size in bytes
    pub size: u8,
}

/// Configure or query a debug channel
///
/// `[channel]` queries, `[channel, mode]` changes the mode and
/// `[channel, mode, offset, control, size]` binds a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigChannelMessage {
    pub channel: u8,
    pub mode: Option<ChannelMode>,
    pub register: Option<ChannelRegister>,
}

impl ConfigChannelMessage {
    /// Set the mode of a channel without touching its register
    pub fn set_mode(channel: u8, mode: ChannelMode) -> Self {
        Self {
            channel,
            mode: Some(mode),
            register: None,
        }
    }

    /// Bind a register to a channel
    pub fn bind(channel: u8, mode: ChannelMode, register: ChannelRegister) -> Self {
        Self {
            channel,
            mode: Some(mode),
            register: Some(register),
        }
    }
}

impl CommandPayload for ConfigChannelMessage {
    const COMMAND: Command = Command::ConfigChannel;

    fn from_payload(payload: &[u8]) -> Result<Self, PayloadError> {
        let (&channel, _) = payload
            .split_first()
            .ok_or(PayloadError::TooShort(Self::COMMAND))?;

        let mode = match payload.get(1) {
            Some(&byte) => Some(ChannelMode::from_byte(byte).ok_or(PayloadError::InvalidValue(byte))?),
            None => None,
        };

        let register = if payload.len() >= FULL_CONFIG_LEN {
            Some(ChannelRegister {
                offset: read_u32(payload, 2),
                control: payload[6],
                size: payload[7],
            })
        } else {
            None
        };

        Ok(Self {
            channel,
            mode,
            register,
        })
    }

    fn to_payload(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(FULL_CONFIG_LEN);
        data.push(self.channel);
        if let Some(mode) = self.mode {
            data.push(mode.to_byte());
            if let Some(register) = self.register {
                data.extend_from_slice(&register.offset.to_le_bytes());
                data.push(register.control);
                data.push(register.size);
            }
        }
        data
    }
}

/// Query (no value) or set the channel decimation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecimationMessage {
    pub decimation: Option<u8>,
}

impl CommandPayload for DecimationMessage {
    const COMMAND: Command = Command::Decimation;

    fn from_payload(payload: &[u8]) -> Result<Self, PayloadError> {
        Ok(Self {
            decimation: payload.first().copied(),
        })
    }

    fn to_payload(&self) -> Vec<u8> {
        self.decimation.into_iter().collect()
    }
}

/// Reset the node time base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResetTimeMessage;

impl CommandPayload for ResetTimeMessage {
    const COMMAND: Command = Command::ResetTime;

    fn from_payload(_payload: &[u8]) -> Result<Self, PayloadError> {
        Ok(Self)
    }

    fn to_payload(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// One sample of all active debug channels
///
/// Channel data is packed from the highest set mask bit down to the lowest.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReadChannelDataMessage {
    /// Node time (24 bits)
    pub timestamp: u32,
    /// Bit `n` set if channel `n` is present
    pub mask: u16,
    /// Concatenated channel values
    pub data: Vec<u8>,
}

impl ReadChannelDataMessage {
    /// Build a sample from `(channel, value)` pairs
    ///
    /// Channels outside `0..16` are ignored.
    pub fn from_channels(timestamp: u32, channels: &[(u8, &[u8])]) -> Self {
        let mut sorted: Vec<&(u8, &[u8])> = channels
            .iter()
            .filter(|(channel, _)| *channel < MAX_DEBUG_CHANNELS)
            .collect();
        sorted.sort_by(|a, b| b.0.cmp(&a.0));

        let mut mask = 0u16;
        let mut data = Vec::new();
        for &(channel, value) in sorted {
            mask |= 1u16 << channel;
            data.extend_from_slice(value);
        }

        Self {
            timestamp: timestamp & TIMESTAMP_MASK,
            mask,
            data,
        }
    }

    /// Split the data into per-channel values
    ///
    /// `size_of` returns the value size of a configured channel; set mask
    /// bits for unconfigured channels are skipped without consuming data.
    pub fn channel_values<F>(&self, size_of: F) -> Result<Vec<(u8, &[u8])>, PayloadError>
    where
        F: Fn(u8) -> Option<usize>,
    {
        let mut values = Vec::new();
        let mut rest = self.data.as_slice();

        for channel in (0..MAX_DEBUG_CHANNELS).rev() {
            if self.mask & (1 << channel) == 0 {
                continue;
            }
            let Some(size) = size_of(channel) else {
                continue;
            };
            if rest.len() < size {
                return Err(PayloadError::LengthMismatch);
            }
            let (value, tail) = rest.split_at(size);
            values.push((channel, value));
            rest = tail;
        }

        Ok(values)
    }
}

impl CommandPayload for ReadChannelDataMessage {
    const COMMAND: Command = Command::ReadChannelData;

    fn from_payload(payload: &[u8]) -> Result<Self, PayloadError> {
        if payload.len() < CHANNEL_DATA_HEADER_LEN {
            return Err(PayloadError::TooShort(Self::COMMAND));
        }

        Ok(Self {
            timestamp: u32::from_le_bytes([payload[0], payload[1], payload[2], 0]),
            mask: u16::from_le_bytes([payload[3], payload[4]]),
            data: payload[CHANNEL_DATA_HEADER_LEN..].to_vec(),
        })
    }

    fn to_payload(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(CHANNEL_DATA_HEADER_LEN + self.data.len());
        data.extend_from_slice(&self.timestamp.to_le_bytes()[..3]);
        data.extend_from_slice(&self.mask.to_le_bytes());
        data.extend_from_slice(&self.data);
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_config_channel_shapes() {
        let query = ConfigChannelMessage::from_payload(&[3]).unwrap();
        assert_eq!(query.mode, None);
        assert_eq!(query.register, None);

        let mode = ConfigChannelMessage::set_mode(3, ChannelMode::OnChange);
        assert_eq!(mode.to_payload(), vec![3, 1]);

        let bind = ConfigChannelMessage::bind(
            2,
            ChannelMode::LowSpeed,
            ChannelRegister {
                offset: 0x0100,
                control: 0x80,
                size: 4,
            },
        );
        let payload = bind.to_payload();
        assert_eq!(payload, vec![2, 2, 0x00, 0x01, 0x00, 0x00, 0x80, 4]);
        assert_eq!(ConfigChannelMessage::from_payload(&payload).unwrap(), bind);
    }

    #[test]
    fn test_config_channel_errors() {
        assert_eq!(
            ConfigChannelMessage::from_payload(&[]),
            Err(PayloadError::TooShort(Command::ConfigChannel))
        );
        assert_eq!(
            ConfigChannelMessage::from_payload(&[0, 9]),
            Err(PayloadError::InvalidValue(9))
        );
    }

    #[test]
    fn test_decimation() {
        assert_eq!(DecimationMessage::from_payload(&[]).unwrap().decimation, None);
        let msg = DecimationMessage {
            decimation: Some(10),
        };
        assert_eq!(msg.to_payload(), vec![10]);
        assert_eq!(DecimationMessage::from_payload(&[10]).unwrap(), msg);
    }

    #[test]
    fn test_read_channel_data_layout() {
        let msg = ReadChannelDataMessage::from_channels(
            0x0012_3456,
            &[(0, &[0x01][..]), (5, &[0x02, 0x03][..])],
        );

        assert_eq!(msg.mask, 0b0010_0001);
        assert_eq!(
            msg.to_payload(),
            vec![0x56, 0x34, 0x12, 0x21, 0x00, 0x02, 0x03, 0x01]
        );
        assert_eq!(
            ReadChannelDataMessage::from_payload(&msg.to_payload()).unwrap(),
            msg
        );
    }

    #[test]
    fn test_channel_values_high_to_low() {
        let msg = ReadChannelDataMessage {
            timestamp: 7,
            mask: 0b1000_0000_0000_0011,
            data: vec![0xAA, 0xBB, 0xCC, 0xDD],
        };
        let sizes = |channel: u8| match channel {
            15 => Some(2),
            1 => Some(1),
            0 => Some(1),
            _ => None,
        };

        let values = msg.channel_values(sizes).unwrap();
        assert_eq!(
            values,
            vec![(15, &[0xAA, 0xBB][..]), (1, &[0xCC][..]), (0, &[0xDD][..])]
        );
    }

    #[test]
    fn test_channel_values_skip_unconfigured() {
        let msg = ReadChannelDataMessage {
            timestamp: 0,
            mask: 0b0110,
            data: vec![0x11],
        };
        let values = msg.channel_values(|c| (c == 1).then_some(1)).unwrap();
        assert_eq!(values, vec![(1, &[0x11][..])]);
    }

    #[test]
    fn test_channel_values_short_data() {
        let msg = ReadChannelDataMessage {
            timestamp: 0,
            mask: 0b1,
            data: vec![0x11],
        };
        assert_eq!(
            msg.channel_values(|_| Some(4)),
            Err(PayloadError::LengthMismatch)
        );
    }

    #[test]
    fn test_read_channel_data_too_short() {
        assert_eq!(
            ReadChannelDataMessage::from_payload(&[0, 0, 0, 1]),
            Err(PayloadError::TooShort(Command::ReadChannelData))
        );
    }
}
