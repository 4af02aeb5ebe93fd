//! Events reported by a connector

use edbg_protocol::{ChannelMode, TraceLevel};

use crate::value::RegisterValue;

/// Something the connector learned from the nodes
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchEvent {
    /// A node answered GetVersion and was added to the model
    NodeFound { node_id: u8 },
    /// A stored register layout was applied to a node
    NodeConfigured { node_id: u8, registers: usize },
    /// A register received a value from a query or a debug channel
    ValueReceived {
        node_id: u8,
        register_id: u32,
        value: RegisterValue,
        /// Node time for channel samples
        timestamp: Option<u32>,
    },
    /// A node answered a register write (0 is success)
    WriteAcknowledged { node_id: u8, result: u8 },
    /// Trace output from a node
    TraceReceived {
        node_id: u8,
        level: TraceLevel,
        message: String,
    },
    /// Debug console text from a node
    TerminalText { node_id: u8, text: String },
    /// A node confirmed a debug channel configuration
    ChannelConfigured {
        node_id: u8,
        channel: u8,
        mode: ChannelMode,
    },
    /// A message could not be handled; `node_id` is the controller it named
    Error { node_id: Option<u8>, message: String },
    /// The transport closed; `lost` if it was not requested
    Disconnected { lost: bool },
}
