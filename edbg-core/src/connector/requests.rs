//! Outbound requests

use edbg_protocol::messages::{
    ChannelRegister, ConfigChannelMessage, DebugStringMessage, DecimationMessage,
    QueryRegisterMessage, ResetTimeMessage, WriteRegisterMessage, MAX_DEBUG_CHANNELS,
};
use edbg_protocol::{ChannelMode, Command, CommandPayload, ProtocolMessage};
use tracing::{debug, trace};

use super::{Connector, DispatchError, BROADCAST_ID};
use crate::config::LayoutStore;
use crate::model::{Model, ModelError};
use crate::traits::{EventSink, Transport};
use crate::value::RegisterValue;

impl<T, S, E> Connector<T, S, E>
where
    T: Transport,
    S: LayoutStore,
    E: EventSink,
{
    /// Encode and send one message
    pub fn send(&mut self, msg: &ProtocolMessage) -> Result<(), DispatchError> {
        if !self.transport.is_connected() {
            return Err(DispatchError::NotConnected);
        }
        let frame = msg.encode();
        trace!("TX: {:?} to node {}, {} bytes", msg.command, msg.controller_id, frame.len());
        self.transport
            .send(&frame)
            .map_err(|e| DispatchError::Transport(e.to_string()))
    }

    /// Ask every node for its version
    pub fn search_for_nodes(&mut self) -> Result<(), DispatchError> {
        debug!("Searching for nodes");
        self.send(&ProtocolMessage::empty(BROADCAST_ID, 0, Command::GetVersion))
    }

    /// Ask a node for its primitive sizes
    pub fn request_info(&mut self, model: &mut Model, node_id: u8) -> Result<(), DispatchError> {
        let msg_id = model.require(node_id)?.next_message_id();
        self.send(&ProtocolMessage::empty(node_id, msg_id, Command::GetInfo))
    }

    /// Request the current value of a register
    pub fn query_register(
        &mut self,
        model: &mut Model,
        node_id: u8,
        register_id: u32,
    ) -> Result<(), DispatchError> {
        let node = model.require(node_id)?;
        let register = node
            .registers
            .get(register_id)
            .ok_or(ModelError::UnknownRegister(register_id))?;
        let request = QueryRegisterMessage::request(
            register.offset,
            register.control_byte(node.protocol_version)?,
            register.wire_size(),
        );

        let msg_id = node.next_message_id();
        self.send(&request.to_message(node_id, msg_id))
    }

    /// Write a value to a register
    ///
    /// The value is padded or truncated to the register size.
    pub fn write_register(
        &mut self,
        model: &mut Model,
        node_id: u8,
        register_id: u32,
        value: &RegisterValue,
    ) -> Result<(), DispatchError> {
        let node = model.require(node_id)?;
        let register = node
            .registers
            .get(register_id)
            .ok_or(ModelError::UnknownRegister(register_id))?;
        let request = WriteRegisterMessage {
            offset: register.offset,
            control: register.control_byte(node.protocol_version)?,
            value: register.encode_value(value),
        };

        let msg_id = node.next_message_id();
        self.send(&request.to_message(node_id, msg_id))
    }

    /// Parse `text` in the configured display format and write it
    pub fn write_register_text(
        &mut self,
        model: &mut Model,
        node_id: u8,
        register_id: u32,
        text: &str,
    ) -> Result<(), DispatchError> {
        let var_type = model
            .require(node_id)?
            .registers
            .get(register_id)
            .ok_or(ModelError::UnknownRegister(register_id))?
            .var_type;
        let value = RegisterValue::from_string(var_type, text, self.config.display_format)?;
        self.write_register(model, node_id, register_id, &value)
    }

    /// Bind a register to a debug channel, change its mode, or turn it off
    ///
    /// The local channel table is updated before the request is sent.
    pub fn config_channel(
        &mut self,
        model: &mut Model,
        node_id: u8,
        channel: u8,
        mode: ChannelMode,
        register_id: Option<u32>,
    ) -> Result<(), DispatchError> {
        let node = model.require(node_id)?;
        node.set_channel(channel, mode, register_id)?;

        let request = match register_id.filter(|_| mode != ChannelMode::Off) {
            Some(id) => {
                let register = node
                    .registers
                    .get(id)
                    .ok_or(ModelError::UnknownRegister(id))?;
                ConfigChannelMessage::bind(
                    channel,
                    mode,
                    ChannelRegister {
                        offset: register.offset,
                        control: register.control_byte(node.protocol_version)?,
                        size: register.wire_size(),
                    },
                )
            }
            None => ConfigChannelMessage::set_mode(channel, mode),
        };

        let msg_id = node.next_message_id();
        self.send(&request.to_message(node_id, msg_id))
    }

    /// Turn every debug channel of a node off
    pub fn reset_channels(&mut self, model: &mut Model, node_id: u8) -> Result<(), DispatchError> {
        for channel in 0..MAX_DEBUG_CHANNELS {
            self.config_channel(model, node_id, channel, ChannelMode::Off, None)?;
        }
        Ok(())
    }

    /// Set how many samples a node skips between channel data messages
    pub fn set_decimation(
        &mut self,
        model: &mut Model,
        node_id: u8,
        decimation: u8,
    ) -> Result<(), DispatchError> {
        let msg_id = model.require(node_id)?.next_message_id();
        let request = DecimationMessage {
            decimation: Some(decimation),
        };
        self.send(&request.to_message(node_id, msg_id))
    }

    /// Reset the time base of a node
    pub fn reset_time(&mut self, model: &mut Model, node_id: u8) -> Result<(), DispatchError> {
        let msg_id = model.require(node_id)?.next_message_id();
        self.send(&ResetTimeMessage.to_message(node_id, msg_id))
    }

    /// Send console text to a node
    pub fn send_debug_string(
        &mut self,
        model: &mut Model,
        node_id: u8,
        text: &str,
    ) -> Result<(), DispatchError> {
        let msg_id = model.require(node_id)?.next_message_id();
        let request = DebugStringMessage {
            text: text.to_string(),
        };
        self.send(&request.to_message(node_id, msg_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DebuggerConfig, MemoryLayoutStore};
    use crate::connector::DispatchEvent;
    use crate::model::{CpuNode, Register};
    use crate::traits::MemoryTransport;
    use crate::value::{ValueDisplayFormat, ValueError};
    use edbg_protocol::{decode_messages, Direction, Version, VariableType};

    type TestConnector = Connector<MemoryTransport, MemoryLayoutStore, Vec<DispatchEvent>>;

    fn setup() -> (TestConnector, Model) {
        setup_with(DebuggerConfig::default())
    }

    fn setup_with(config: DebuggerConfig) -> (TestConnector, Model) {
        let mut transport = MemoryTransport::new();
        transport.connect().unwrap();
        let connector = Connector::new(
            config,
            transport,
            MemoryLayoutStore::new(),
            Vec::new(),
        );

        let mut model = Model::new();
        let node = model
            .add_node(CpuNode::new(1, Version::new(1, 0, 0), Version::new(0, 1, 0), "cpu", ""))
            .unwrap();
        node.load_registers([Register::new(7, "speed", 0x0100, VariableType::Int, 4)
            .with_direction(Direction::ReadWrite)])
            .unwrap();
        (connector, model)
    }

    fn sent(connector: &mut TestConnector) -> Vec<ProtocolMessage> {
        let bytes: Vec<u8> = connector.transport_mut().take_sent().concat();
        let (messages, rest) = decode_messages(&bytes, &[]);
        assert!(rest.is_empty());
        messages.into_iter().map(|m| m.unwrap()).collect()
    }

    #[test]
    fn test_search_for_nodes_broadcasts() {
        let (mut connector, _) = setup();
        connector.search_for_nodes().unwrap();

        let msgs = sent(&mut connector);
        assert_eq!(msgs, vec![ProtocolMessage::empty(0xFF, 0, Command::GetVersion)]);
    }

    #[test]
    fn test_query_register_request() {
        let (mut connector, mut model) = setup();
        connector.query_register(&mut model, 1, 7).unwrap();
        connector.query_register(&mut model, 1, 7).unwrap();

        let msgs = sent(&mut connector);
        assert_eq!(msgs[0].command, Command::QueryRegister);
        assert_eq!(msgs[0].message_id, 0);
        assert_eq!(msgs[1].message_id, 1);
        // offset, ReadWrite in bits 7-6, size
        assert_eq!(msgs[0].payload, vec![0x00, 0x01, 0x00, 0x00, 0xC0, 0x04]);

        assert!(matches!(
            connector.query_register(&mut model, 1, 99),
            Err(DispatchError::Model(ModelError::UnknownRegister(99)))
        ));
        assert!(matches!(
            connector.query_register(&mut model, 2, 7),
            Err(DispatchError::Model(ModelError::UnknownNode(2)))
        ));
    }

    #[test]
    fn test_write_register_pads_value() {
        let (mut connector, mut model) = setup();
        connector
            .write_register(&mut model, 1, 7, &RegisterValue::Short(-2))
            .unwrap();

        let msgs = sent(&mut connector);
        let write = WriteRegisterMessage::from_message(&msgs[0]).unwrap();
        assert_eq!(write.offset, 0x0100);
        assert_eq!(write.value, vec![0xFE, 0xFF, 0x00, 0x00]);
    }

    #[test]
    fn test_write_register_text_uses_display_format() {
        let (mut connector, mut model) = setup_with(DebuggerConfig {
            display_format: ValueDisplayFormat::Hex,
            ..DebuggerConfig::default()
        });
        connector.write_register_text(&mut model, 1, 7, "1F").unwrap();
        let write = WriteRegisterMessage::from_message(&sent(&mut connector)[0]).unwrap();
        assert_eq!(write.value, vec![0x1F, 0x00, 0x00, 0x00]);

        // The same text is not a decimal number
        let (mut connector, mut model) = setup();
        assert!(matches!(
            connector.write_register_text(&mut model, 1, 7, "1F"),
            Err(DispatchError::Value(ValueError::Parse { .. }))
        ));
        connector.write_register_text(&mut model, 1, 7, "31").unwrap();
        let write = WriteRegisterMessage::from_message(&sent(&mut connector)[0]).unwrap();
        assert_eq!(write.value, vec![0x1F, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_config_channel_binds_locally() {
        let (mut connector, mut model) = setup();
        connector
            .config_channel(&mut model, 1, 2, ChannelMode::LowSpeed, Some(7))
            .unwrap();

        assert_eq!(model.node(1).unwrap().channel(2).unwrap().register_id, 7);
        let msgs = sent(&mut connector);
        let config = ConfigChannelMessage::from_message(&msgs[0]).unwrap();
        assert_eq!(config.mode, Some(ChannelMode::LowSpeed));
        assert_eq!(config.register.unwrap().size, 4);

        connector.reset_channels(&mut model, 1).unwrap();
        assert_eq!(model.node(1).unwrap().channels().count(), 0);
        assert_eq!(sent(&mut connector).len(), 16);
    }

    #[test]
    fn test_send_requires_connection() {
        let (mut connector, mut model) = setup();
        connector.disconnect().unwrap();
        assert!(matches!(
            connector.reset_time(&mut model, 1),
            Err(DispatchError::NotConnected)
        ));
        assert_eq!(
            connector.events(),
            &vec![DispatchEvent::Disconnected { lost: false }]
        );
    }
}
