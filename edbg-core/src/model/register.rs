//! A single register of a node

use edbg_protocol::{ChannelMode, ControlByte, ControlError, Direction, Source, Version, VariableType};
use heapless::HistoryBuffer;

use crate::value::{RegisterValue, TimedValue};

/// Number of received values kept per register
pub const HISTORY_LEN: usize = 16;

/// A named, offset-addressed value slot on a node
#[derive(Debug, Clone)]
pub struct Register {
    /// Unique id within the node
    pub id: u32,
    /// Short name
    pub name: String,
    /// Name including the names of all ancestors
    pub full_name: String,
    /// Address on the node
    pub offset: u32,
    /// Wire representation of the value
    pub var_type: VariableType,
    /// Size of the storage on the node in bytes
    pub size: u32,
    /// Access direction this register is used for
    pub direction: Direction,
    /// Where the definition came from
    pub source: Source,
    /// Number of pointer indirections before the value
    pub deref_depth: u8,
    /// Debug channel streaming this register, if any
    pub channel: Option<u8>,
    /// Mode of the assigned debug channel
    pub channel_mode: ChannelMode,
    pub(super) parent: Option<u32>,
    pub(super) children: Vec<u32>,
    value: RegisterValue,
    history: HistoryBuffer<TimedValue, HISTORY_LEN>,
}

impl Register {
    /// Create a register holding the zero value of `var_type`
    pub fn new(id: u32, name: &str, offset: u32, var_type: VariableType, size: u32) -> Self {
        Self {
            id,
            name: name.to_string(),
            full_name: name.to_string(),
            offset,
            var_type,
            size,
            direction: Direction::Read,
            source: Source::ElfParsed,
            deref_depth: 0,
            channel: None,
            channel_mode: ChannelMode::Off,
            parent: None,
            children: Vec::new(),
            value: RegisterValue::zero(var_type),
            history: HistoryBuffer::new(),
        }
    }

    /// Set the access direction
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Set the definition source
    pub fn with_source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    /// Set the dereference depth (masked to 4 bits on the wire)
    pub fn with_deref_depth(mut self, depth: u8) -> Self {
        self.deref_depth = depth;
        self
    }

    /// Set the parent id; links are resolved when inserted into a tree
    pub fn with_parent(mut self, parent: u32) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn parent(&self) -> Option<u32> {
        self.parent
    }

    pub fn children(&self) -> &[u32] {
        &self.children
    }

    /// Current value
    pub fn value(&self) -> &RegisterValue {
        &self.value
    }

    /// Received values, oldest first
    pub fn history(&self) -> impl Iterator<Item = &TimedValue> {
        self.history.oldest_ordered()
    }

    /// Most recently received value
    pub fn last_received(&self) -> Option<&TimedValue> {
        self.history.recent()
    }

    /// Interpret raw bytes from the node and make them the current value
    pub fn add_value(&mut self, bytes: &[u8], timestamp: Option<u32>) -> &RegisterValue {
        self.value = RegisterValue::from_bytes(self.var_type, bytes);
        self.history.write(TimedValue {
            value: self.value.clone(),
            timestamp,
        });
        &self.value
    }

    /// Drop all received values
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Control byte contents for an access in this register's direction
    pub fn control(&self) -> ControlByte {
        ControlByte::new(self.direction, self.source, self.deref_depth)
    }

    /// Encoded control byte for a node speaking `version`
    pub fn control_byte(&self, version: Version) -> Result<u8, ControlError> {
        self.control().encode(version)
    }

    /// Size field for query and channel requests
    pub fn wire_size(&self) -> u8 {
        self.size.min(u8::MAX as u32) as u8
    }

    /// Bytes to send when writing `value` to this register
    ///
    /// The value is zero-padded or truncated to the register size.
    pub fn encode_value(&self, value: &RegisterValue) -> Vec<u8> {
        let mut bytes = value.to_bytes();
        if self.size > 0 {
            bytes.resize(self.wire_size() as usize, 0);
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_value_updates_current_and_history() {
        let mut reg = Register::new(1, "speed", 0x10, VariableType::Int, 4);
        assert_eq!(reg.value(), &RegisterValue::Int(0));
        assert!(reg.last_received().is_none());

        reg.add_value(&[0x34, 0x12], Some(7));
        assert_eq!(reg.value(), &RegisterValue::Int(0x1234));

        let last = reg.last_received().unwrap();
        assert_eq!(last.timestamp, Some(7));
        assert_eq!(last.value, RegisterValue::Int(0x1234));
    }

    #[test]
    fn test_history_is_bounded() {
        let mut reg = Register::new(1, "counter", 0, VariableType::UChar, 1);
        for i in 0..40u8 {
            reg.add_value(&[i], None);
        }

        let values: Vec<_> = reg.history().map(|v| v.value.clone()).collect();
        assert_eq!(values.len(), HISTORY_LEN);
        assert_eq!(values[0], RegisterValue::UChar(40 - HISTORY_LEN as u8));
        assert_eq!(values[HISTORY_LEN - 1], RegisterValue::UChar(39));
    }

    #[test]
    fn test_control_byte_follows_version() {
        let reg = Register::new(1, "x", 0, VariableType::Int, 4)
            .with_direction(Direction::Write)
            .with_source(Source::SimulinkCApiIndex)
            .with_deref_depth(2);

        assert_eq!(reg.control_byte(Version::new(0, 6, 0)), Ok(0x80 | 0x50 | 0x02));
        assert_eq!(reg.control_byte(Version::new(1, 0, 0)), Ok(0x42));
        assert!(reg.control_byte(Version::new(0, 9, 0)).is_err());
    }

    #[test]
    fn test_encode_value_fits_register_size() {
        let reg = Register::new(1, "x", 0, VariableType::Int, 2);
        assert_eq!(reg.encode_value(&RegisterValue::Int(0x0102_0304)), vec![0x04, 0x03]);

        let reg = Register::new(2, "s", 0, VariableType::String, 4);
        assert_eq!(
            reg.encode_value(&RegisterValue::String("ab".to_string())),
            vec![b'a', b'b', 0, 0]
        );
    }
}
