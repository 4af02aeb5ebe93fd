//! Command identifiers

/// Commands understood by the protocol
///
/// The byte values are fixed by the protocol and also appear in layout files
/// and external tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Command {
    /// Request protocol/application version and node identity
    GetVersion,
    /// Request primitive type sizes and time step
    GetInfo,
    /// Write a register value
    WriteRegister,
    /// Read a register value once
    QueryRegister,
    /// Assign a register to a debug channel
    ConfigChannel,
    /// Set the debug channel sample decimation
    Decimation,
    /// Reset the node time base
    ResetTime,
    /// Sampled debug channel data
    ReadChannelData,
    /// Terminal text in either direction
    DebugString,
    /// Register layout exchange
    EmbeddedConfiguration,
    /// Trace output from the node
    Tracing,
}

// Wire format values
const CMD_GET_VERSION: u8 = 0x56;
const CMD_GET_INFO: u8 = 0x49;
const CMD_WRITE_REGISTER: u8 = 0x57;
const CMD_QUERY_REGISTER: u8 = 0x51;
const CMD_CONFIG_CHANNEL: u8 = 0x43;
const CMD_DECIMATION: u8 = 0x44;
const CMD_RESET_TIME: u8 = 0x54;
const CMD_READ_CHANNEL_DATA: u8 = 0x52;
const CMD_DEBUG_STRING: u8 = 0x53;
const CMD_EMBEDDED_CONFIGURATION: u8 = 0x45;
const CMD_TRACING: u8 = 0x41;

impl Command {
    /// All commands, in wire table order
    pub const ALL: [Command; 11] = [
        Command::GetVersion,
        Command::GetInfo,
        Command::WriteRegister,
        Command::QueryRegister,
        Command::ConfigChannel,
        Command::Decimation,
        Command::ResetTime,
        Command::ReadChannelData,
        Command::DebugString,
        Command::EmbeddedConfiguration,
        Command::Tracing,
    ];

    /// Parse a command from its wire format byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            CMD_GET_VERSION => Some(Command::GetVersion),
            CMD_GET_INFO => Some(Command::GetInfo),
            CMD_WRITE_REGISTER => Some(Command::WriteRegister),
            CMD_QUERY_REGISTER => Some(Command::QueryRegister),
            CMD_CONFIG_CHANNEL => Some(Command::ConfigChannel),
            CMD_DECIMATION => Some(Command::Decimation),
            CMD_RESET_TIME => Some(Command::ResetTime),
            CMD_READ_CHANNEL_DATA => Some(Command::ReadChannelData),
            CMD_DEBUG_STRING => Some(Command::DebugString),
            CMD_EMBEDDED_CONFIGURATION => Some(Command::EmbeddedConfiguration),
            CMD_TRACING => Some(Command::Tracing),
            _ => None,
        }
    }

    /// Convert to wire format byte
    pub fn to_byte(self) -> u8 {
        match self {
            Command::GetVersion => CMD_GET_VERSION,
            Command::GetInfo => CMD_GET_INFO,
            Command::WriteRegister => CMD_WRITE_REGISTER,
            Command::QueryRegister => CMD_QUERY_REGISTER,
            Command::ConfigChannel => CMD_CONFIG_CHANNEL,
            Command::Decimation => CMD_DECIMATION,
            Command::ResetTime => CMD_RESET_TIME,
            Command::ReadChannelData => CMD_READ_CHANNEL_DATA,
            Command::DebugString => CMD_DEBUG_STRING,
            Command::EmbeddedConfiguration => CMD_EMBEDDED_CONFIGURATION,
            Command::Tracing => CMD_TRACING,
        }
    }
}
