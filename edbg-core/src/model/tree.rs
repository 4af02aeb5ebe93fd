//! Register arena with id-based parent/child links

use std::collections::{BTreeMap, BTreeSet};

use edbg_protocol::Direction;

use super::{ModelError, Register};

/// Registers of one node, indexed by id and by offset
///
/// The offset of a register must not change once it is inserted.
#[derive(Debug, Clone, Default)]
pub struct RegisterTree {
    registers: BTreeMap<u32, Register>,
    /// Ids of the registers at each offset
    by_offset: BTreeMap<u32, BTreeSet<u32>>,
}

impl RegisterTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a register, linking it below its parent if it names one
    ///
    /// The parent must already be present.
    pub fn insert(&mut self, mut register: Register) -> Result<(), ModelError> {
        if self.registers.contains_key(&register.id) {
            return Err(ModelError::DuplicateRegister(register.id));
        }
        register.children.clear();

        let id = register.id;
        let offset = register.offset;
        let parent = register.parent.take();
        self.registers.insert(id, register);
        self.by_offset.entry(offset).or_default().insert(id);
        if let Some(parent) = parent {
            if let Err(err) = self.set_parent(id, Some(parent)) {
                self.remove_unlinked(id, offset);
                return Err(err);
            }
        }
        Ok(())
    }

    fn remove_unlinked(&mut self, id: u32, offset: u32) {
        self.registers.remove(&id);
        if let Some(ids) = self.by_offset.get_mut(&offset) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_offset.remove(&offset);
            }
        }
    }

    pub fn get(&self, id: u32) -> Option<&Register> {
        self.registers.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Register> {
        self.registers.get_mut(&id)
    }

    /// Registers at `offset` in id order
    pub fn at_offset(&self, offset: u32) -> impl Iterator<Item = &Register> {
        self.by_offset
            .get(&offset)
            .into_iter()
            .flatten()
            .filter_map(|id| self.registers.get(id))
    }

    /// Register at `offset` used for `direction`
    ///
    /// Read and write registers may share an offset, so both must match.
    pub fn find_register(&self, offset: u32, direction: Direction) -> Option<&Register> {
        self.at_offset(offset).find(|r| r.direction == direction)
    }

    pub fn find_register_mut(&mut self, offset: u32, direction: Direction) -> Option<&mut Register> {
        let id = self.find_register(offset, direction)?.id;
        self.registers.get_mut(&id)
    }

    /// Whether `ancestor` appears in the parent chain of `id`, or is `id`
    fn is_self_or_ancestor(&self, ancestor: u32, id: u32) -> bool {
        let mut current = Some(id);
        // A valid chain visits each register at most once
        let mut remaining = self.registers.len() + 1;
        while let Some(cur) = current {
            if cur == ancestor {
                return true;
            }
            if remaining == 0 {
                return true;
            }
            remaining -= 1;
            current = self.registers.get(&cur).and_then(|r| r.parent);
        }
        false
    }

    /// Move `child` below `parent`, or make it a root with `None`
    ///
    /// Rejected if `parent` is `child` itself or one of its descendants.
    pub fn set_parent(&mut self, child: u32, parent: Option<u32>) -> Result<(), ModelError> {
        if !self.registers.contains_key(&child) {
            return Err(ModelError::UnknownRegister(child));
        }
        if let Some(parent) = parent {
            if !self.registers.contains_key(&parent) {
                return Err(ModelError::UnknownRegister(parent));
            }
            if self.is_self_or_ancestor(child, parent) {
                return Err(ModelError::ParentCycle { child, parent });
            }
        }

        let old = self.registers.get_mut(&child).and_then(|r| r.parent.take());
        if let Some(old) = old.and_then(|old| self.registers.get_mut(&old)) {
            old.children.retain(|&c| c != child);
        }

        if let Some(parent) = parent {
            if let Some(reg) = self.registers.get_mut(&parent) {
                reg.children.push(child);
            }
            if let Some(reg) = self.registers.get_mut(&child) {
                reg.parent = Some(parent);
            }
        }
        self.update_full_names(child);
        Ok(())
    }

    /// Recompute `full_name` of `id` and its descendants
    fn update_full_names(&mut self, id: u32) {
        let mut pending = vec![id];
        while let Some(cur) = pending.pop() {
            let parent_name = self
                .registers
                .get(&cur)
                .and_then(|r| r.parent)
                .and_then(|p| self.registers.get(&p))
                .map(|p| p.full_name.clone());
            if let Some(reg) = self.registers.get_mut(&cur) {
                reg.full_name = match parent_name {
                    Some(parent) => format!("{}.{}", parent, reg.name),
                    None => reg.name.clone(),
                };
                pending.extend_from_slice(&reg.children);
            }
        }
    }

    /// Registers without a parent
    pub fn roots(&self) -> impl Iterator<Item = &Register> {
        self.registers.values().filter(|r| r.parent.is_none())
    }

    /// All registers in id order
    pub fn iter(&self) -> impl Iterator<Item = &Register> {
        self.registers.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Register> {
        self.registers.values_mut()
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    pub fn clear(&mut self) {
        self.registers.clear();
        self.by_offset.clear();
    }
}
