//! Enumerations shared by messages, layouts and the register model

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Read/write capability of a register, or direction of an access
///
/// Bit 1 marks readable, bit 0 marks writable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    /// Neither readable nor writable
    None,
    /// Write only
    Write,
    /// Read only
    #[default]
    Read,
    /// Read and write
    ReadWrite,
}

impl Direction {
    /// Decode the two low bits of `bits`
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Direction::None,
            1 => Direction::Write,
            2 => Direction::Read,
            _ => Direction::ReadWrite,
        }
    }

    /// Two bit wire value
    pub fn bits(self) -> u8 {
        match self {
            Direction::None => 0,
            Direction::Write => 1,
            Direction::Read => 2,
            Direction::ReadWrite => 3,
        }
    }

    /// Returns true if reads are allowed
    pub fn is_readable(self) -> bool {
        self.bits() & 0x02 != 0
    }

    /// Returns true if writes are allowed
    pub fn is_writable(self) -> bool {
        self.bits() & 0x01 != 0
    }
}

/// Where a register definition came from (only encoded before protocol 0.7)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Source {
    HandwrittenOffset,
    HandwrittenIndex,
    SimulinkCApiOffset,
    SimulinkCApiIndex,
    #[default]
    ElfParsed,
}

// Source bit patterns (bits 6-4 of the pre-0.7 control byte)
const SRC_HANDWRITTEN_OFFSET: u8 = 0x00;
const SRC_HANDWRITTEN_INDEX: u8 = 0x10;
const SRC_SIMULINK_CAPI_OFFSET: u8 = 0x40;
const SRC_SIMULINK_CAPI_INDEX: u8 = 0x50;
const SRC_ELF_PARSED: u8 = 0x70;

/// Mask selecting the source field of a pre-0.7 control byte
pub const SOURCE_MASK: u8 = 0x70;

impl Source {
    /// Parse a source from its (already masked) bit pattern
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            SRC_HANDWRITTEN_OFFSET => Some(Source::HandwrittenOffset),
            SRC_HANDWRITTEN_INDEX => Some(Source::HandwrittenIndex),
            SRC_SIMULINK_CAPI_OFFSET => Some(Source::SimulinkCApiOffset),
            SRC_SIMULINK_CAPI_INDEX => Some(Source::SimulinkCApiIndex),
            SRC_ELF_PARSED => Some(Source::ElfParsed),
            _ => None,
        }
    }

    /// Bit pattern in the control byte
    pub fn bits(self) -> u8 {
        match self {
            Source::HandwrittenOffset => SRC_HANDWRITTEN_OFFSET,
            Source::HandwrittenIndex => SRC_HANDWRITTEN_INDEX,
            Source::SimulinkCApiOffset => SRC_SIMULINK_CAPI_OFFSET,
            Source::SimulinkCApiIndex => SRC_SIMULINK_CAPI_INDEX,
            Source::ElfParsed => SRC_ELF_PARSED,
        }
    }
}

/// Wire representation of a register value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VariableType {
    MemoryAlignment,
    Pointer,
    Bool,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    LongDouble,
    /// Microsecond time base; its size entry is the tick length
    TimeStamp,
    SChar,
    UChar,
    UShort,
    UInt,
    ULong,
    String,
    Blob,
    #[default]
    Unknown,
}

impl VariableType {
    /// All types that may appear in a GetInfo response
    pub const ALL: [VariableType; 19] = [
        VariableType::MemoryAlignment,
        VariableType::Pointer,
        VariableType::Bool,
        VariableType::Char,
        VariableType::Short,
        VariableType::Int,
        VariableType::Long,
        VariableType::Float,
        VariableType::Double,
        VariableType::LongDouble,
        VariableType::TimeStamp,
        VariableType::SChar,
        VariableType::UChar,
        VariableType::UShort,
        VariableType::UInt,
        VariableType::ULong,
        VariableType::String,
        VariableType::Blob,
        VariableType::Unknown,
    ];

    /// Parse a type from its wire format byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        let ty = match byte {
            0x00 => VariableType::MemoryAlignment,
            0x01 => VariableType::Pointer,
            0x02 => VariableType::Bool,
            0x03 => VariableType::Char,
            0x04 => VariableType::Short,
            0x05 => VariableType::Int,
            0x06 => VariableType::Long,
            0x07 => VariableType::Float,
            0x08 => VariableType::Double,
            0x09 => VariableType::LongDouble,
            0x0A => VariableType::TimeStamp,
            0x0B => VariableType::SChar,
            0x0C => VariableType::UChar,
            0x0D => VariableType::UShort,
            0x0E => VariableType::UInt,
            0x0F => VariableType::ULong,
            0x10 => VariableType::String,
            0x11 => VariableType::Blob,
            0xFF => VariableType::Unknown,
            _ => return None,
        };
        Some(ty)
    }

    /// Convert to wire format byte
    pub fn to_byte(self) -> u8 {
        match self {
            VariableType::MemoryAlignment => 0x00,
            VariableType::Pointer => 0x01,
            VariableType::Bool => 0x02,
            VariableType::Char => 0x03,
            VariableType::Short => 0x04,
            VariableType::Int => 0x05,
            VariableType::Long => 0x06,
            VariableType::Float => 0x07,
            VariableType::Double => 0x08,
            VariableType::LongDouble => 0x09,
            VariableType::TimeStamp => 0x0A,
            VariableType::SChar => 0x0B,
            VariableType::UChar => 0x0C,
            VariableType::UShort => 0x0D,
            VariableType::UInt => 0x0E,
            VariableType::ULong => 0x0F,
            VariableType::String => 0x10,
            VariableType::Blob => 0x11,
            VariableType::Unknown => 0xFF,
        }
    }

    /// Size assumed for a node until its GetInfo response arrives
    ///
    /// For [`VariableType::TimeStamp`] this is the tick length in
    /// microseconds rather than a byte count.
    pub fn default_size(self) -> u32 {
        match self {
            VariableType::MemoryAlignment => 1,
            VariableType::Pointer => 4,
            VariableType::Bool => 1,
            VariableType::Char => 1,
            VariableType::Short => 2,
            VariableType::Int => 4,
            VariableType::Long => 8,
            VariableType::Float => 4,
            VariableType::Double => 8,
            VariableType::LongDouble => 8,
            VariableType::TimeStamp => 1000,
            VariableType::SChar => 1,
            VariableType::UChar => 1,
            VariableType::UShort => 2,
            VariableType::UInt => 4,
            VariableType::ULong => 8,
            VariableType::String => 0,
            VariableType::Blob => 0,
            VariableType::Unknown => 0,
        }
    }
}

/// Debug channel sampling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ChannelMode {
    #[default]
    Off,
    OnChange,
    LowSpeed,
    Once,
}

impl ChannelMode {
    /// Parse a mode from its wire format byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(ChannelMode::Off),
            1 => Some(ChannelMode::OnChange),
            2 => Some(ChannelMode::LowSpeed),
            3 => Some(ChannelMode::Once),
            _ => None,
        }
    }

    /// Convert to wire format byte
    pub fn to_byte(self) -> u8 {
        match self {
            ChannelMode::Off => 0,
            ChannelMode::OnChange => 1,
            ChannelMode::LowSpeed => 2,
            ChannelMode::Once => 3,
        }
    }
}

/// Severity of a trace message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TraceLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl TraceLevel {
    /// Parse a level from its wire format byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(TraceLevel::Trace),
            1 => Some(TraceLevel::Debug),
            2 => Some(TraceLevel::Info),
            3 => Some(TraceLevel::Warning),
            4 => Some(TraceLevel::Error),
            5 => Some(TraceLevel::Fatal),
            _ => None,
        }
    }

    /// Convert to wire format byte
    pub fn to_byte(self) -> u8 {
        match self {
            TraceLevel::Trace => 0,
            TraceLevel::Debug => 1,
            TraceLevel::Info => 2,
            TraceLevel::Warning => 3,
            TraceLevel::Error => 4,
            TraceLevel::Fatal => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_bits() {
        for bits in 0..4 {
            assert_eq!(Direction::from_bits(bits).bits(), bits);
        }
        assert!(Direction::ReadWrite.is_readable());
        assert!(Direction::ReadWrite.is_writable());
        assert!(Direction::Read.is_readable());
        assert!(!Direction::Read.is_writable());
        assert!(!Direction::None.is_readable());
    }

    #[test]
    fn test_source_bits() {
        assert_eq!(Source::SimulinkCApiIndex.bits(), 0x50);
        assert_eq!(Source::from_bits(0x70), Some(Source::ElfParsed));
        assert_eq!(Source::from_bits(0x20), None);
    }

    #[test]
    fn test_variable_type_roundtrip() {
        for ty in VariableType::ALL {
            assert_eq!(VariableType::from_byte(ty.to_byte()), Some(ty));
        }
        assert_eq!(VariableType::from_byte(0x12), None);
    }

    #[test]
    fn test_default_sizes() {
        assert_eq!(VariableType::Int.default_size(), 4);
        assert_eq!(VariableType::Long.default_size(), 8);
        assert_eq!(VariableType::TimeStamp.default_size(), 1000);
        assert_eq!(VariableType::String.default_size(), 0);
    }

    #[test]
    fn test_channel_mode_and_trace_level() {
        assert_eq!(ChannelMode::from_byte(2), Some(ChannelMode::LowSpeed));
        assert_eq!(ChannelMode::from_byte(4), None);
        assert_eq!(TraceLevel::from_byte(5), Some(TraceLevel::Fatal));
        assert_eq!(TraceLevel::Warning.to_byte(), 3);
        assert!(TraceLevel::Error > TraceLevel::Info);
    }
}
