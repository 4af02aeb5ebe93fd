//! Control byte encoding
//!
//! The control byte packs the access direction, the register source and the
//! pointer dereference depth. Its layout depends on the node protocol version:
//!
//! | Protocol        | Bit 7     | Bits 6-4 | Bits 3-0 |
//! |-----------------|-----------|----------|----------|
//! | `< 0.7.0`       | 1 = write | source   | depth    |
//! | `0.8.0`/`1.0.0` | direction (bits 7-6) | | depth |
//!
//! Only the exact versions 0.8.0 and 1.0.0 select the second layout. Every
//! other version, including 0.7.x and anything newer than 1.0.0, is rejected.

use core::fmt;

use crate::types::{Direction, Source, SOURCE_MASK};
use crate::version::Version;

/// First version that no longer uses the legacy layout
const LEGACY_LIMIT: Version = Version::new(0, 7, 0);

/// Versions using the two bit direction layout
const DIRECTION_FIELD_VERSIONS: [Version; 2] = [Version::new(0, 8, 0), Version::new(1, 0, 0)];

/// Mask selecting the dereference depth
const DEPTH_MASK: u8 = 0x0F;

/// Legacy write flag
const LEGACY_WRITE: u8 = 0x80;

/// Shift of the two bit direction field
const DIRECTION_SHIFT: u8 = 6;

/// Errors from control byte encoding or decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlError {
    /// The node speaks a protocol version without a known control layout
    UnsupportedVersion(Version),
    /// Legacy source bits do not name a known source
    InvalidSource(u8),
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlError::UnsupportedVersion(v) => write!(f, "Version not supported: {}", v),
            ControlError::InvalidSource(bits) => write!(f, "Invalid source bits: {:#04x}", bits),
        }
    }
}

/// Decoded control byte contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlByte {
    /// Direction of the access
    pub direction: Direction,
    /// Register source (always `ElfParsed` from 0.8.0 on)
    pub source: Source,
    /// Number of pointer indirections (0-15)
    pub deref_depth: u8,
}

impl ControlByte {
    /// Create a new control byte description
    pub fn new(direction: Direction, source: Source, deref_depth: u8) -> Self {
        Self {
            direction,
            source,
            deref_depth,
        }
    }

    /// Pack into a single byte for the given protocol version
    pub fn encode(&self, version: Version) -> Result<u8, ControlError> {
        let depth = self.deref_depth & DEPTH_MASK;
        if version < LEGACY_LIMIT {
            let write = if self.direction == Direction::Write {
                LEGACY_WRITE
            } else {
                0
            };
            Ok(write | self.source.bits() | depth)
        } else if DIRECTION_FIELD_VERSIONS.contains(&version) {
            Ok(depth | (self.direction.bits() << DIRECTION_SHIFT))
        } else {
            Err(ControlError::UnsupportedVersion(version))
        }
    }

    /// Unpack a control byte sent by a node of the given protocol version
    pub fn decode(version: Version, byte: u8) -> Result<Self, ControlError> {
        let deref_depth = byte & DEPTH_MASK;
        if version < LEGACY_LIMIT {
            let direction = if byte & LEGACY_WRITE != 0 {
                Direction::Write
            } else {
                Direction::Read
            };
            let bits = byte & SOURCE_MASK;
            let source = Source::from_bits(bits).ok_or(ControlError::InvalidSource(bits))?;
            Ok(Self::new(direction, source, deref_depth))
        } else if DIRECTION_FIELD_VERSIONS.contains(&version) {
            let direction = Direction::from_bits(byte >> DIRECTION_SHIFT);
            Ok(Self::new(direction, Source::ElfParsed, deref_depth))
        } else {
            Err(ControlError::UnsupportedVersion(version))
        }
    }
}
