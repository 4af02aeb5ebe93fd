//! Byte transport trait

use std::fmt;

use thiserror::Error;

/// A byte stream connection to one or more nodes
///
/// Implementations deliver received bytes by handing them to
/// [`Connector::receive`](crate::connector::Connector::receive) from their
/// read loop, and report an unexpected loss of the link through
/// [`Connector::transport_lost`](crate::connector::Connector::transport_lost).
pub trait Transport {
    /// Transport specific error
    type Error: fmt::Display + fmt::Debug;

    /// Open the connection
    fn connect(&mut self) -> Result<(), Self::Error>;

    /// Close the connection on request of the user
    fn disconnect(&mut self) -> Result<(), Self::Error>;

    /// Send one encoded frame
    fn send(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Check if the connection is open
    fn is_connected(&self) -> bool;
}

/// Errors from [`MemoryTransport`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemoryTransportError {
    #[error("transport is not connected")]
    NotConnected,
}

/// Transport that records sent frames in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    connected: bool,
    sent: Vec<Vec<u8>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames sent so far
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    /// Remove and return the frames sent so far
    pub fn take_sent(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.sent)
    }
}

impl Transport for MemoryTransport {
    type Error = MemoryTransportError;

    fn connect(&mut self) -> Result<(), Self::Error> {
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), Self::Error> {
        self.connected = false;
        Ok(())
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        if !self.connected {
            return Err(MemoryTransportError::NotConnected);
        }
        self.sent.push(bytes.to_vec());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
