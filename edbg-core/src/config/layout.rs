//! Register layout definitions

use std::path::PathBuf;

use edbg_protocol::{Direction, Source, Version, VariableType};
use serde::{Deserialize, Serialize};

use crate::model::{CpuNode, Register};

/// Current layout format version
pub const LAYOUT_VERSION: u8 = 1;

/// One register in a stored layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterDef {
    pub id: u32,
    pub name: String,
    pub offset: u32,
    pub var_type: VariableType,
    pub size: u32,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub deref_depth: u8,
    #[serde(default)]
    pub parent: Option<u32>,
}

impl RegisterDef {
    /// Build a model register from this definition
    pub fn to_register(&self) -> Register {
        let register = Register::new(self.id, &self.name, self.offset, self.var_type, self.size)
            .with_direction(self.direction)
            .with_source(self.source)
            .with_deref_depth(self.deref_depth);
        match self.parent {
            Some(parent) => register.with_parent(parent),
            None => register,
        }
    }
}

impl From<&Register> for RegisterDef {
    fn from(register: &Register) -> Self {
        Self {
            id: register.id,
            name: register.name.clone(),
            offset: register.offset,
            var_type: register.var_type,
            size: register.size,
            direction: register.direction,
            source: register.source,
            deref_depth: register.deref_depth,
            parent: register.parent(),
        }
    }
}

/// All registers of one node firmware
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterLayout {
    /// Format version, checked on load
    pub version: u8,
    #[serde(default)]
    pub registers: Vec<RegisterDef>,
}

impl Default for RegisterLayout {
    fn default() -> Self {
        Self {
            version: LAYOUT_VERSION,
            registers: Vec::new(),
        }
    }
}

impl RegisterLayout {
    pub fn new(registers: Vec<RegisterDef>) -> Self {
        Self {
            version: LAYOUT_VERSION,
            registers,
        }
    }

    /// Snapshot the registers of a node
    pub fn from_node(node: &CpuNode) -> Self {
        Self::new(node.registers.iter().map(RegisterDef::from).collect())
    }

    /// Model registers in definition order
    pub fn to_registers(&self) -> impl Iterator<Item = Register> + '_ {
        self.registers.iter().map(RegisterDef::to_register)
    }
}

/// Identifies the layout of one node firmware
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayoutKey {
    /// Connector the node was found on
    pub connector: String,
    pub node_id: u8,
    pub node_name: String,
    pub application_version: Version,
}

impl LayoutKey {
    pub fn new(connector: &str, node: &CpuNode) -> Self {
        Self {
            connector: connector.to_string(),
            node_id: node.id,
            node_name: node.name.trim().to_string(),
            application_version: node.application_version,
        }
    }

    /// `cpuII-VMM_mm_PPPP`
    pub fn file_stem(&self) -> String {
        let v = self.application_version;
        format!(
            "cpu{:02}-V{:02}_{:02}_{:04}",
            self.node_id, v.major, v.minor, v.patch
        )
    }

    /// Path below the layout root, with the given extension
    pub fn relative_path(&self, extension: &str) -> PathBuf {
        let mut path = PathBuf::from(&self.connector);
        path.push(&self.node_name);
        path.push(format!("{}.{}", self.file_stem(), extension));
        path
    }
}
