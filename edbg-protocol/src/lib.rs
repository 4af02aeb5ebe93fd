//! Embedded Debugger Wire Protocol
//!
//! This crate defines the framed binary protocol spoken between the debugger
//! host and one or more embedded CPU nodes. Connections deliver arbitrary byte
//! chunks, so the codec resynchronizes on frame delimiters and carries partial
//! frames over between reads.
//!
//! # Protocol Overview
//!
//! Every message travels in a single escaped frame:
//! ```text
//! ┌─────┬─────────┬────────┬─────┬──────────────┬─────┬─────┐
//! │ STX │ CTRL ID │ MSG ID │ CMD │ COMMAND DATA │ CRC │ ETX │
//! │ 55h │ 1B      │ 1B     │ 1B  │ 0..n B       │ 1B  │ AAh │
//! └─────┴─────────┴────────┴─────┴──────────────┴─────┴─────┘
//! ```
//!
//! STX, ETX and ESC (66h) occurring between the delimiters are sent as
//! `ESC, ESC ^ byte`. The CRC is CRC-8/MAXIM over `CTRL ID .. COMMAND DATA`.
//! Multi-byte fields inside command data are little-endian.

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod checksum;
pub mod codec;
pub mod command;
pub mod control;
pub mod frame;
pub mod messages;
pub mod types;
pub mod version;

pub use checksum::crc8;
pub use codec::{
    decode_messages, encode_message, validate, DecodedMessage, InvalidFrame, MessageDecoder,
    ProtocolMessage,
};
pub use command::Command;
pub use control::{ControlByte, ControlError};
pub use frame::{FrameError, ESC, ETX, STX};
pub use messages::{CommandPayload, PayloadError};
pub use types::{ChannelMode, Direction, Source, TraceLevel, VariableType};
pub use version::Version;
