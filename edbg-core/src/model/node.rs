//! One embedded CPU node

use std::collections::BTreeMap;

use edbg_protocol::messages::{InfoEntry, MAX_DEBUG_CHANNELS};
use edbg_protocol::{ChannelMode, Direction, Version, VariableType};

use super::{ModelError, Register, RegisterTree};

/// Whether a register layout has been applied to a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigState {
    #[default]
    Unloaded,
    Loaded,
}

/// A debug channel streaming one register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSlot {
    /// Register bound to the channel
    pub register_id: u32,
    /// Streaming mode
    pub mode: ChannelMode,
    /// Bytes per sample
    pub size: u8,
}

/// A controller discovered on a connection
#[derive(Debug, Clone)]
pub struct CpuNode {
    /// Controller id (0xFF is broadcast and never used by a node)
    pub id: u8,
    pub protocol_version: Version,
    pub application_version: Version,
    pub name: String,
    pub serial_number: String,
    /// Primitive sizes reported by GetInfo
    pub sizes: BTreeMap<VariableType, u32>,
    pub registers: RegisterTree,
    pub config_state: ConfigState,
    /// Messages received from this node
    pub message_counter: u64,
    /// Invalid frames naming this node
    pub invalid_counter: u64,
    /// Last decimation reported by the node
    pub decimation: Option<u8>,
    channels: [Option<ChannelSlot>; MAX_DEBUG_CHANNELS as usize],
    next_message_id: u8,
}

impl CpuNode {
    pub fn new(
        id: u8,
        protocol_version: Version,
        application_version: Version,
        name: &str,
        serial_number: &str,
    ) -> Self {
        Self {
            id,
            protocol_version,
            application_version,
            name: name.trim().to_string(),
            serial_number: serial_number.to_string(),
            sizes: BTreeMap::new(),
            registers: RegisterTree::new(),
            config_state: ConfigState::Unloaded,
            message_counter: 0,
            invalid_counter: 0,
            decimation: None,
            channels: [None; MAX_DEBUG_CHANNELS as usize],
            next_message_id: 0,
        }
    }

    /// Next message id for a request to this node
    ///
    /// Ids start at 0 and skip 0 when they wrap.
    pub fn next_message_id(&mut self) -> u8 {
        let id = self.next_message_id;
        self.next_message_id = match self.next_message_id.wrapping_add(1) {
            0 => 1,
            next => next,
        };
        id
    }

    /// Record the primitive sizes from a GetInfo response
    pub fn apply_info(&mut self, entries: &[InfoEntry]) {
        for entry in entries {
            self.sizes.insert(entry.var_type, entry.size);
        }
    }

    /// Size of `var_type` on this node, if reported
    pub fn size_of(&self, var_type: VariableType) -> Option<u32> {
        self.sizes.get(&var_type).copied()
    }

    /// Replace all registers and mark the node configured
    pub fn load_registers<I>(&mut self, registers: I) -> Result<(), ModelError>
    where
        I: IntoIterator<Item = Register>,
    {
        let mut tree = RegisterTree::new();
        let mut deferred = Vec::new();
        for register in registers {
            // Parents may be listed after their children
            match register.parent() {
                Some(parent) if tree.get(parent).is_none() => deferred.push(register),
                _ => tree.insert(register)?,
            }
        }
        while !deferred.is_empty() {
            let before = deferred.len();
            let mut still_pending = Vec::new();
            for register in deferred {
                match register.parent() {
                    Some(parent) if tree.get(parent).is_none() => still_pending.push(register),
                    _ => tree.insert(register)?,
                }
            }
            if still_pending.len() == before {
                let missing = still_pending[0].parent().unwrap_or_default();
                return Err(ModelError::UnknownRegister(missing));
            }
            deferred = still_pending;
        }

        self.registers = tree;
        self.channels = [None; MAX_DEBUG_CHANNELS as usize];
        self.config_state = ConfigState::Loaded;
        Ok(())
    }

    pub fn find_register(&self, offset: u32, direction: Direction) -> Option<&Register> {
        self.registers.find_register(offset, direction)
    }

    pub fn channel(&self, channel: u8) -> Option<&ChannelSlot> {
        self.channels.get(channel as usize).and_then(Option::as_ref)
    }

    /// Active channels as `(channel, slot)`
    pub fn channels(&self) -> impl Iterator<Item = (u8, &ChannelSlot)> {
        self.channels
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|slot| (i as u8, slot)))
    }

    /// Bind `register_id` to `channel`, or free the channel with mode Off
    pub fn set_channel(
        &mut self,
        channel: u8,
        mode: ChannelMode,
        register_id: Option<u32>,
    ) -> Result<(), ModelError> {
        if channel >= MAX_DEBUG_CHANNELS {
            return Err(ModelError::InvalidChannel(channel));
        }

        let previous = self.channels[channel as usize].take();
        if let Some(reg) = previous.and_then(|slot| self.registers.get_mut(slot.register_id)) {
            reg.channel = None;
            reg.channel_mode = ChannelMode::Off;
        }

        if mode == ChannelMode::Off {
            return Ok(());
        }

        // A mode change without a register keeps the current binding
        let register_id = match register_id.or(previous.map(|slot| slot.register_id)) {
            Some(id) => id,
            None => return Ok(()),
        };
        let reg = self
            .registers
            .get_mut(register_id)
            .ok_or(ModelError::UnknownRegister(register_id))?;
        reg.channel = Some(channel);
        reg.channel_mode = mode;
        self.channels[channel as usize] = Some(ChannelSlot {
            register_id,
            mode,
            size: reg.wire_size(),
        });
        Ok(())
    }

    /// Free every debug channel
    pub fn clear_channels(&mut self) {
        for channel in 0..MAX_DEBUG_CHANNELS {
            // Channel index is always in range
            let _ = self.set_channel(channel, ChannelMode::Off, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> CpuNode {
        CpuNode::new(1, Version::new(0, 8, 0), Version::new(1, 2, 3), " FOITN ", "001")
    }

    #[test]
    fn test_message_ids_skip_zero_on_wrap() {
        let mut node = node();
        assert_eq!(node.next_message_id(), 0);
        assert_eq!(node.next_message_id(), 1);
        for _ in 2..=255 {
            node.next_message_id();
        }
        assert_eq!(node.next_message_id(), 1);
    }

    #[test]
    fn test_name_is_trimmed() {
        assert_eq!(node().name, "FOITN");
    }

    #[test]
    fn test_apply_info() {
        let mut node = node();
        node.apply_info(&[
            InfoEntry {
                var_type: VariableType::Int,
                size: 4,
            },
            InfoEntry {
                var_type: VariableType::TimeStamp,
                size: 1000,
            },
        ]);
        assert_eq!(node.size_of(VariableType::Int), Some(4));
        assert_eq!(node.size_of(VariableType::TimeStamp), Some(1000));
        assert_eq!(node.size_of(VariableType::Long), None);
    }

    #[test]
    fn test_load_registers_out_of_order() {
        let mut node = node();
        node.load_registers([
            Register::new(2, "child", 4, VariableType::Int, 4).with_parent(1),
            Register::new(1, "parent", 0, VariableType::Int, 4),
        ])
        .unwrap();

        assert_eq!(node.config_state, ConfigState::Loaded);
        assert_eq!(node.registers.get(1).unwrap().children(), &[2]);
    }

    #[test]
    fn test_load_registers_missing_parent() {
        let mut node = node();
        let result = node.load_registers([Register::new(2, "orphan", 4, VariableType::Int, 4).with_parent(7)]);
        assert_eq!(result, Err(ModelError::UnknownRegister(7)));
        assert_eq!(node.config_state, ConfigState::Unloaded);
    }

    #[test]
    fn test_channel_binding() {
        let mut node = node();
        node.load_registers([Register::new(5, "temp", 0x20, VariableType::Short, 2)])
            .unwrap();

        node.set_channel(3, ChannelMode::LowSpeed, Some(5)).unwrap();
        assert_eq!(
            node.channel(3),
            Some(&ChannelSlot {
                register_id: 5,
                mode: ChannelMode::LowSpeed,
                size: 2,
            })
        );
        assert_eq!(node.registers.get(5).unwrap().channel, Some(3));

        node.set_channel(3, ChannelMode::OnChange, None).unwrap();
        assert_eq!(node.channel(3).unwrap().mode, ChannelMode::OnChange);

        node.set_channel(3, ChannelMode::Off, None).unwrap();
        assert!(node.channel(3).is_none());
        assert_eq!(node.registers.get(5).unwrap().channel, None);

        assert_eq!(
            node.set_channel(16, ChannelMode::Once, Some(5)),
            Err(ModelError::InvalidChannel(16))
        );
        assert_eq!(
            node.set_channel(0, ChannelMode::Once, Some(9)),
            Err(ModelError::UnknownRegister(9))
        );
    }
}
