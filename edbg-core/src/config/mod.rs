//! Debugger configuration and register layout persistence
//!
//! The debugger settings are read from a TOML file. Register layouts are
//! stored per node and application version; they are read as TOML first,
//! falling back to a postcard binary file.

mod layout;
mod settings;
mod store;

pub use layout::{LayoutKey, RegisterDef, RegisterLayout, LAYOUT_VERSION};
pub use settings::{ConfigError, DebuggerConfig};
pub use store::{DirLayoutStore, LayoutError, LayoutStore, MemoryLayoutStore};
