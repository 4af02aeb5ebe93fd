//! Typed command payloads
//!
//! Each command carries a fixed payload shape. The types here convert between
//! that shape and the raw command data of a [`ProtocolMessage`]. Multi-byte
//! fields are little-endian.

mod channel;
mod info;
mod register;
mod text;
mod version;

use alloc::vec::Vec;
use core::fmt;

use crate::codec::ProtocolMessage;
use crate::command::Command;

pub use channel::{
    ChannelRegister, ConfigChannelMessage, DecimationMessage, ReadChannelDataMessage,
    ResetTimeMessage, MAX_DEBUG_CHANNELS,
};
pub use info::{InfoEntry, InfoMessage, REC_SEP};
pub use register::{QueryRegisterMessage, WriteRegisterMessage, WriteResultMessage, MAX_VALUE_LEN};
pub use text::{DebugStringMessage, TraceMessage};
pub use version::{VersionMessage, MAX_NAME_LEN};

/// Errors decoding command data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PayloadError {
    /// Payload shorter than the command requires
    TooShort(Command),
    /// A length field does not match the data that follows
    LengthMismatch,
    /// A byte does not map to a known enumeration value
    InvalidValue(u8),
    /// Text does not fit its bounded buffer
    TooLong,
    /// Message carries a different command
    WrongCommand(Command),
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadError::TooShort(command) => {
                write!(f, "Message too short for {:?} message", command)
            }
            PayloadError::LengthMismatch => f.write_str("Value size does not match size field"),
            PayloadError::InvalidValue(byte) => write!(f, "Invalid value {:#04x}", byte),
            PayloadError::TooLong => f.write_str("Text too long"),
            PayloadError::WrongCommand(command) => write!(f, "Unexpected {:?} message", command),
        }
    }
}

/// Conversion between a typed payload and raw command data
pub trait CommandPayload: Sized {
    /// Command carrying this payload
    const COMMAND: Command;

    /// Decode from raw command data
    fn from_payload(payload: &[u8]) -> Result<Self, PayloadError>;

    /// Encode to raw command data
    fn to_payload(&self) -> Vec<u8>;

    /// Wrap into a protocol message
    fn to_message(&self, controller_id: u8, message_id: u8) -> ProtocolMessage {
        ProtocolMessage::new(controller_id, message_id, Self::COMMAND, self.to_payload())
    }

    /// Decode the command data of `msg`, checking the command first
    fn from_message(msg: &ProtocolMessage) -> Result<Self, PayloadError> {
        if msg.command != Self::COMMAND {
            return Err(PayloadError::WrongCommand(msg.command));
        }
        Self::from_payload(&msg.payload)
    }
}

/// Read a little-endian u32 at `at`; the caller checks the length
fn read_u32(payload: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([
        payload[at],
        payload[at + 1],
        payload[at + 2],
        payload[at + 3],
    ])
}
