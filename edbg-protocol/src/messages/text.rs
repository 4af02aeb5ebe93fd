//! DebugString and Tracing payloads

use alloc::string::String;
use alloc::vec::Vec;

use super::{CommandPayload, PayloadError};
use crate::command::Command;
use crate::types::TraceLevel;

/// Terminal text, in either direction
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DebugStringMessage {
    pub text: String,
}

impl CommandPayload for DebugStringMessage {
    const COMMAND: Command = Command::DebugString;

    fn from_payload(payload: &[u8]) -> Result<Self, PayloadError> {
        Ok(Self {
            text: String::from_utf8_lossy(payload).into_owned(),
        })
    }

    fn to_payload(&self) -> Vec<u8> {
        self.text.as_bytes().to_vec()
    }
}

/// Trace output from a node
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TraceMessage {
    /// Severity
    pub level: TraceLevel,
    /// Trace text
    pub message: String,
}

impl CommandPayload for TraceMessage {
    const COMMAND: Command = Command::Tracing;

    fn from_payload(payload: &[u8]) -> Result<Self, PayloadError> {
        let (&level, text) = payload
            .split_first()
            .ok_or(PayloadError::TooShort(Self::COMMAND))?;
        let level = TraceLevel::from_byte(level).ok_or(PayloadError::InvalidValue(level))?;

        Ok(Self {
            level,
            message: String::from_utf8_lossy(text).into_owned(),
        })
    }

    fn to_payload(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(1 + self.message.len());
        data.push(self.level.to_byte());
        data.extend_from_slice(self.message.as_bytes());
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_debug_string_roundtrip() {
        let msg = DebugStringMessage {
            text: "héllo\n".to_string(),
        };
        assert_eq!(DebugStringMessage::from_payload(&msg.to_payload()).unwrap(), msg);
    }

    #[test]
    fn test_trace_roundtrip() {
        let msg = TraceMessage {
            level: TraceLevel::Warning,
            message: "EmbeddedConfig has been called".to_string(),
        };
        let payload = msg.to_payload();

        assert_eq!(payload[0], 3);
        assert_eq!(TraceMessage::from_payload(&payload).unwrap(), msg);
    }

    #[test]
    fn test_trace_level_only() {
        let msg = TraceMessage::from_payload(&[5]).unwrap();
        assert_eq!(msg.level, TraceLevel::Fatal);
        assert!(msg.message.is_empty());
    }

    #[test]
    fn test_trace_errors() {
        assert_eq!(
            TraceMessage::from_payload(&[]),
            Err(PayloadError::TooShort(Command::Tracing))
        );
        assert_eq!(
            TraceMessage::from_payload(&[9, b'x']),
            Err(PayloadError::InvalidValue(9))
        );
    }
}
