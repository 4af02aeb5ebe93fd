//! Host side of the embedded register debugger
//!
//! This crate holds everything above the wire protocol:
//!
//! - Typed register values and their text formats
//! - The register tree and node model of a connection
//! - Debugger settings and stored register layouts
//! - Transport and event sink traits
//! - Connector dispatch from received frames to model updates

#![deny(unsafe_code)]

pub mod config;
pub mod connector;
pub mod model;
pub mod traits;
pub mod value;

pub use config::{DebuggerConfig, DirLayoutStore, LayoutKey, LayoutStore, MemoryLayoutStore};
pub use connector::{Connector, DispatchError, DispatchEvent};
pub use model::{CpuNode, Model, Register};
pub use value::{RegisterValue, ValueDisplayFormat};
