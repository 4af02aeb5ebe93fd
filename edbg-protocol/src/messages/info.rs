//! GetInfo response

use alloc::vec::Vec;

use super::{read_u32, CommandPayload, PayloadError};
use crate::command::Command;
use crate::types::VariableType;

/// Separator between GetInfo records
pub const REC_SEP: u8 = 0x33;

/// Size of one primitive type on the node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InfoEntry {
    /// Primitive type
    pub var_type: VariableType,
    /// Size in bytes, or tick length in microseconds for TimeStamp
    pub size: u32,
}

/// Primitive sizes reported by a node
///
/// Records are `[type, size]`, except TimeStamp which is
/// `[type, u32 LE]`, and are separated by [`REC_SEP`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InfoMessage {
    pub entries: Vec<InfoEntry>,
}

/// Parse the record at the start of `data`, returning it and its length
fn parse_record(data: &[u8]) -> Result<(InfoEntry, usize), PayloadError> {
    let (&type_byte, rest) = data
        .split_first()
        .ok_or(PayloadError::TooShort(Command::GetInfo))?;
    let var_type = VariableType::from_byte(type_byte).ok_or(PayloadError::InvalidValue(type_byte))?;

    if var_type == VariableType::TimeStamp {
        if rest.len() < 4 {
            return Err(PayloadError::TooShort(Command::GetInfo));
        }
        Ok((InfoEntry { var_type, size: read_u32(rest, 0) }, 5))
    } else {
        let size = *rest.first().ok_or(PayloadError::TooShort(Command::GetInfo))?;
        Ok((
            InfoEntry {
                var_type,
                size: size as u32,
            },
            2,
        ))
    }
}

impl CommandPayload for InfoMessage {
    const COMMAND: Command = Command::GetInfo;

    /// Records are read by their type's length; [`REC_SEP`] is only
    /// skipped between records, so size bytes equal to it stay intact.
    fn from_payload(payload: &[u8]) -> Result<Self, PayloadError> {
        if payload.len() < 2 {
            return Err(PayloadError::TooShort(Self::COMMAND));
        }

        let mut entries = Vec::new();
        let mut at = 0;
        while at < payload.len() {
            // No type byte equals the separator
            if payload[at] == REC_SEP {
                at += 1;
                continue;
            }
            let (entry, len) = parse_record(&payload[at..])?;
            entries.push(entry);
            at += len;
        }

        Ok(Self { entries })
    }

    fn to_payload(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.entries.len() * 3);
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                data.push(REC_SEP);
            }
            data.push(entry.var_type.to_byte());
            if entry.var_type == VariableType::TimeStamp {
                data.extend_from_slice(&entry.size.to_le_bytes());
            } else {
                data.push(entry.size as u8);
            }
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_info_parse() {
        let payload = [
            0x00, 0x01, 0x33, 0x01, 0x04, 0x33, 0x05, 0x04, 0x33, 0x06, 0x08, 0x33, 0x0A, 0xE8,
            0x03, 0x00, 0x00,
        ];
        let msg = InfoMessage::from_payload(&payload).unwrap();

        assert_eq!(msg.entries.len(), 5);
        assert_eq!(
            msg.entries[2],
            InfoEntry {
                var_type: VariableType::Int,
                size: 4
            }
        );
        assert_eq!(
            msg.entries[4],
            InfoEntry {
                var_type: VariableType::TimeStamp,
                size: 1000
            }
        );
        assert_eq!(msg.to_payload(), payload.to_vec());
    }

    #[test]
    fn test_info_too_short() {
        assert_eq!(
            InfoMessage::from_payload(&[0x05]),
            Err(PayloadError::TooShort(Command::GetInfo))
        );
    }

    #[test]
    fn test_info_unknown_type() {
        assert_eq!(
            InfoMessage::from_payload(&[0x20, 0x01]),
            Err(PayloadError::InvalidValue(0x20))
        );
    }

    #[test]
    fn test_info_sizes_equal_to_separator() {
        let msg = InfoMessage {
            entries: vec![
                InfoEntry {
                    var_type: VariableType::TimeStamp,
                    size: 51,
                },
                InfoEntry {
                    var_type: VariableType::Blob,
                    size: u32::from(REC_SEP),
                },
            ],
        };
        let payload = msg.to_payload();
        assert_eq!(payload, vec![0x0A, 0x33, 0x00, 0x00, 0x00, 0x33, 0x11, 0x33]);
        assert_eq!(InfoMessage::from_payload(&payload), Ok(msg));
    }

    #[test]
    fn test_info_truncated_timestamp() {
        assert_eq!(
            InfoMessage::from_payload(&[0x0A, 0xE8, 0x03]),
            Err(PayloadError::TooShort(Command::GetInfo))
        );
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn entry() -> impl Strategy<Value = InfoEntry> {
            (0..VariableType::ALL.len(), any::<u32>()).prop_map(|(i, size)| {
                let var_type = VariableType::ALL[i];
                let size = if var_type == VariableType::TimeStamp {
                    size
                } else {
                    size & 0xFF
                };
                InfoEntry { var_type, size }
            })
        }

        proptest! {
            #[test]
            fn test_info_roundtrip(entries in proptest::collection::vec(entry(), 1..12)) {
                let msg = InfoMessage { entries };
                prop_assert_eq!(InfoMessage::from_payload(&msg.to_payload()), Ok(msg));
            }
        }
    }
}
