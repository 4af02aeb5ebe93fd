//! GetVersion response

use alloc::string::String as AllocString;
use alloc::vec::Vec;
use heapless::String;

use super::{CommandPayload, PayloadError};
use crate::command::Command;
use crate::version::{Version, VERSION_SIZE};

/// Maximum node name or serial number length (one length byte)
pub const MAX_NAME_LEN: usize = u8::MAX as usize;

/// Two versions plus the name length byte
const MIN_VERSION_PAYLOAD: usize = 2 * VERSION_SIZE + 1;

/// Node identity sent in response to GetVersion
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VersionMessage {
    /// Protocol version spoken by the node
    pub protocol_version: Version,
    /// Firmware version
    pub application_version: Version,
    /// Node name
    pub name: String<MAX_NAME_LEN>,
    /// Serial number, empty if the node did not send one
    pub serial_number: String<MAX_NAME_LEN>,
}

impl VersionMessage {
    /// Create a version message
    ///
    /// Line breaks and tabs are dropped from the texts, as a receiver
    /// would drop them.
    pub fn new(
        protocol_version: Version,
        application_version: Version,
        name: &str,
        serial_number: &str,
    ) -> Result<Self, PayloadError> {
        Ok(Self {
            protocol_version,
            application_version,
            name: clean(name)?,
            serial_number: clean(serial_number)?,
        })
    }
}

/// Bounded node text without line breaks and tabs
fn clean(text: &str) -> Result<String<MAX_NAME_LEN>, PayloadError> {
    let mut out = String::new();
    for c in text.chars().filter(|c| !matches!(c, '\n' | '\r' | '\t')) {
        out.push(c).map_err(|_| PayloadError::TooLong)?;
    }
    Ok(out)
}

/// Decode node text, dropping line breaks and tabs
fn clean_text(bytes: &[u8]) -> Result<String<MAX_NAME_LEN>, PayloadError> {
    clean(&AllocString::from_utf8_lossy(bytes))
}

/// Take up to `len` bytes starting at `at`
fn take(payload: &[u8], at: usize, len: usize) -> &[u8] {
    let start = at.min(payload.len());
    let end = at.saturating_add(len).min(payload.len());
    &payload[start..end]
}

impl CommandPayload for VersionMessage {
    const COMMAND: Command = Command::GetVersion;

    fn from_payload(payload: &[u8]) -> Result<Self, PayloadError> {
        if payload.len() < MIN_VERSION_PAYLOAD {
            return Err(PayloadError::TooShort(Self::COMMAND));
        }

        let protocol_version = Version::from_bytes([payload[0], payload[1], payload[2], payload[3]]);
        let application_version =
            Version::from_bytes([payload[4], payload[5], payload[6], payload[7]]);

        let name_len = payload[8] as usize;
        let name = clean_text(take(payload, MIN_VERSION_PAYLOAD, name_len))?;

        // Serial number is optional
        let serial_at = MIN_VERSION_PAYLOAD + name_len;
        let serial_number = match payload.get(serial_at) {
            Some(&serial_len) => clean_text(take(payload, serial_at + 1, serial_len as usize))?,
            None => String::new(),
        };

        Ok(Self {
            protocol_version,
            application_version,
            name,
            serial_number,
        })
    }

    fn to_payload(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(
            MIN_VERSION_PAYLOAD + self.name.len() + 1 + self.serial_number.len(),
        );
        data.extend_from_slice(&self.protocol_version.to_bytes());
        data.extend_from_slice(&self.application_version.to_bytes());
        data.push(self.name.len() as u8);
        data.extend_from_slice(self.name.as_bytes());
        if !self.serial_number.is_empty() {
            data.push(self.serial_number.len() as u8);
            data.extend_from_slice(self.serial_number.as_bytes());
        }
        data
    }
}
