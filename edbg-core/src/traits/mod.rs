//! Seams between the connector and its surroundings
//!
//! A [`Transport`] moves bytes to and from the nodes. An [`EventSink`]
//! receives everything the connector learns from them.

pub mod events;
pub mod transport;

pub use events::EventSink;
pub use transport::{MemoryTransport, MemoryTransportError, Transport};
