//! Register and node model
//!
//! A [`Model`] owns every [`CpuNode`] seen on one connection. Each node owns
//! its registers in a flat [`RegisterTree`] arena; parent and child links are
//! register ids, never references.

mod node;
mod register;
mod registry;
mod tree;

use edbg_protocol::ControlError;
use thiserror::Error;

pub use node::{ChannelSlot, ConfigState, CpuNode};
pub use register::{Register, HISTORY_LEN};
pub use registry::Model;
pub use tree::RegisterTree;

/// Errors from model lookups and updates
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A node with this id already exists
    #[error("CpuNode already known")]
    NodeAlreadyKnown(u8),
    /// No node with this id
    #[error("No node found for the msg")]
    UnknownNode(u8),
    /// No register with this id
    #[error("No register with id {0}")]
    UnknownRegister(u32),
    /// No register at this offset for the given direction
    #[error("No register found with this offset or readwrite")]
    NoMatchingRegister { offset: u32 },
    /// A register with this id already exists
    #[error("Register id {0} is already in use")]
    DuplicateRegister(u32),
    /// The new parent is the register itself or one of its descendants
    #[error("Register {child} cannot be a child of {parent}")]
    ParentCycle { child: u32, parent: u32 },
    /// Debug channel index outside the channel table
    #[error("Debug channel {0} does not exist")]
    InvalidChannel(u8),
    /// Control byte cannot be built or read for the node's protocol version
    #[error("{0}")]
    Control(ControlError),
}

impl From<ControlError> for ModelError {
    fn from(err: ControlError) -> Self {
        ModelError::Control(err)
    }
}
