//! Connector dispatch
//!
//! A [`Connector`] turns received byte chunks into model updates and
//! [`DispatchEvent`]s, and turns requests from the user into frames on the
//! [`Transport`](crate::traits::Transport). The [`Model`](crate::model::Model)
//! is passed in by its owner on every call.

mod dispatch;
mod events;
mod requests;

use edbg_protocol::{ControlError, FrameError, PayloadError};
use thiserror::Error;

use crate::config::LayoutError;
use crate::model::ModelError;
use crate::value::ValueError;

pub use dispatch::Connector;
pub use events::DispatchEvent;

/// Controller id addressing every node
pub const BROADCAST_ID: u8 = 0xFF;

/// Errors handling a single message or request
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The frame failed validation
    #[error("{}", .0.reason())]
    Frame(FrameError),
    #[error("{0}")]
    Payload(PayloadError),
    #[error("{0}")]
    Control(ControlError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Value(#[from] ValueError),
    /// The node answered a query with an empty value
    #[error("Error reading occured")]
    ReadFailed,
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Not connected")]
    NotConnected,
}

impl From<FrameError> for DispatchError {
    fn from(err: FrameError) -> Self {
        DispatchError::Frame(err)
    }
}

impl From<PayloadError> for DispatchError {
    fn from(err: PayloadError) -> Self {
        DispatchError::Payload(err)
    }
}

impl From<ControlError> for DispatchError {
    fn from(err: ControlError) -> Self {
        DispatchError::Control(err)
    }
}
