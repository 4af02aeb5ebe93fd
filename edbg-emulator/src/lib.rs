//! Simulated CPU node
//!
//! [`EmulatedNode`] answers protocol requests from an in-memory register map
//! and produces debug channel samples on [`EmulatedNode::tick`]. It is used
//! to exercise a connector without hardware.

#![deny(unsafe_code)]

mod node;

pub use node::{EmulatedNode, LOW_SPEED_DIVIDER};
