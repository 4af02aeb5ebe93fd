//! QueryRegister and WriteRegister payloads

use alloc::vec::Vec;

use super::{read_u32, CommandPayload, PayloadError};
use crate::command::Command;

/// Longest value a single length byte can describe
pub const MAX_VALUE_LEN: usize = u8::MAX as usize;

/// Offset, control byte and size/length byte
const REGISTER_HEADER_LEN: usize = 6;

/// Register read request or response
///
/// A request carries no value. A response carries the bytes read; a
/// response with size 0 signals a read error on the node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueryRegisterMessage {
    /// Register offset
    pub offset: u32,
    /// Control byte (see [`crate::control`])
    pub control: u8,
    /// Requested size in bytes
    pub size: u8,
    /// Value bytes, present in responses
    pub value: Option<Vec<u8>>,
}

impl QueryRegisterMessage {
    /// Create a read request
    pub fn request(offset: u32, control: u8, size: u8) -> Self {
        Self {
            offset,
            control,
            size,
            value: None,
        }
    }

    /// Create a response carrying `value`
    pub fn response(offset: u32, control: u8, value: &[u8]) -> Self {
        let value = &value[..value.len().min(MAX_VALUE_LEN)];
        Self {
            offset,
            control,
            size: value.len() as u8,
            value: Some(value.to_vec()),
        }
    }
}

impl CommandPayload for QueryRegisterMessage {
    const COMMAND: Command = Command::QueryRegister;

    fn from_payload(payload: &[u8]) -> Result<Self, PayloadError> {
        if payload.len() < REGISTER_HEADER_LEN {
            return Err(PayloadError::TooShort(Self::COMMAND));
        }

        let size = payload[5];
        let rest = &payload[REGISTER_HEADER_LEN..];
        // Size 0 never carries a value, whatever follows it
        let value = if rest.is_empty() || size == 0 {
            None
        } else {
            Some(rest[..rest.len().min(size as usize)].to_vec())
        };

        Ok(Self {
            offset: read_u32(payload, 0),
            control: payload[4],
            size,
            value,
        })
    }

    fn to_payload(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(REGISTER_HEADER_LEN + self.size as usize);
        data.extend_from_slice(&self.offset.to_le_bytes());
        data.push(self.control);
        match &self.value {
            None => data.push(self.size),
            Some(value) => {
                let len = value.len().min(MAX_VALUE_LEN);
                data.push(len as u8);
                data.extend_from_slice(&value[..len]);
            }
        }
        data
    }
}

/// Register write request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WriteRegisterMessage {
    /// Register offset
    pub offset: u32,
    /// Control byte
    pub control: u8,
    /// Bytes to write
    pub value: Vec<u8>,
}

impl CommandPayload for WriteRegisterMessage {
    const COMMAND: Command = Command::WriteRegister;

    fn from_payload(payload: &[u8]) -> Result<Self, PayloadError> {
        if payload.len() < REGISTER_HEADER_LEN {
            return Err(PayloadError::TooShort(Self::COMMAND));
        }

        let value = &payload[REGISTER_HEADER_LEN..];
        if value.len() != payload[5] as usize {
            return Err(PayloadError::LengthMismatch);
        }

        Ok(Self {
            offset: read_u32(payload, 0),
            control: payload[4],
            value: value.to_vec(),
        })
    }

    fn to_payload(&self) -> Vec<u8> {
        let len = self.value.len().min(MAX_VALUE_LEN);
        let mut data = Vec::with_capacity(REGISTER_HEADER_LEN + len);
        data.extend_from_slice(&self.offset.to_le_bytes());
        data.push(self.control);
        data.push(len as u8);
        data.extend_from_slice(&self.value[..len]);
        data
    }
}

/// Node acknowledgement of a register write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WriteResultMessage {
    /// Result code, 0 on success
    pub result: u8,
}

impl WriteResultMessage {
    /// Returns true if the node reported success
    pub fn is_ok(&self) -> bool {
        self.result == 0
    }
}

impl CommandPayload for WriteResultMessage {
    const COMMAND: Command = Command::WriteRegister;

    fn from_payload(payload: &[u8]) -> Result<Self, PayloadError> {
        let result = *payload
            .first()
            .ok_or(PayloadError::TooShort(Self::COMMAND))?;
        Ok(Self { result })
    }

    fn to_payload(&self) -> Vec<u8> {
        alloc::vec![self.result]
    }
}
