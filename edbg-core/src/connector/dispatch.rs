//! Inbound message handling

use edbg_protocol::messages::{
    ConfigChannelMessage, DebugStringMessage, DecimationMessage, InfoMessage,
    QueryRegisterMessage, ReadChannelDataMessage, TraceMessage, VersionMessage,
    WriteResultMessage,
};
use edbg_protocol::{
    Command, CommandPayload, ControlByte, InvalidFrame, MessageDecoder, PayloadError,
    ProtocolMessage,
};
use tracing::{debug, info, trace, warn};

use super::{DispatchError, DispatchEvent};
use crate::config::{DebuggerConfig, LayoutKey, LayoutStore};
use crate::model::{CpuNode, Model, ModelError};
use crate::traits::{EventSink, Transport};
use crate::value::RegisterValue;

/// Protocol handling for one transport connection
///
/// Owns the decoder remainder of the connection, so every connection needs
/// its own connector.
pub struct Connector<T, S, E> {
    pub(super) config: DebuggerConfig,
    pub(super) transport: T,
    pub(super) layouts: S,
    pub(super) events: E,
    decoder: MessageDecoder,
}

impl<T, S, E> Connector<T, S, E>
where
    T: Transport,
    S: LayoutStore,
    E: EventSink,
{
    pub fn new(config: DebuggerConfig, transport: T, layouts: S, events: E) -> Self {
        Self {
            config,
            transport,
            layouts,
            events,
            decoder: MessageDecoder::new(),
        }
    }

    pub fn config(&self) -> &DebuggerConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn layouts_mut(&mut self) -> &mut S {
        &mut self.layouts
    }

    /// Render a value in the configured display format
    pub fn format_value(&self, value: &RegisterValue) -> String {
        value.format(self.config.display_format)
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut E {
        &mut self.events
    }

    /// Open the transport, forgetting all previously known nodes
    pub fn connect(&mut self, model: &mut Model) -> Result<(), DispatchError> {
        model.clear();
        self.decoder.reset();
        self.transport
            .connect()
            .map_err(|e| DispatchError::Transport(e.to_string()))?;
        info!("Connected ({})", self.config.connector_name);

        if self.config.search_on_connect {
            self.search_for_nodes()?;
        }
        Ok(())
    }

    /// Close the transport on request of the user
    pub fn disconnect(&mut self) -> Result<(), DispatchError> {
        self.decoder.reset();
        self.transport
            .disconnect()
            .map_err(|e| DispatchError::Transport(e.to_string()))?;
        info!("Disconnected ({})", self.config.connector_name);
        self.events.emit(DispatchEvent::Disconnected { lost: false });
        Ok(())
    }

    /// The transport closed without being asked to
    pub fn transport_lost(&mut self) {
        warn!("Connection lost ({})", self.config.connector_name);
        self.decoder.reset();
        self.events.emit(DispatchEvent::Disconnected { lost: true });
    }

    /// Feed a received chunk; returns the number of valid messages in it
    ///
    /// A message that cannot be handled is reported as an error event and
    /// does not stop the remaining messages of the chunk.
    pub fn receive(&mut self, model: &mut Model, chunk: &[u8]) -> usize {
        trace!("RX: {} bytes", chunk.len());

        let mut handled = 0;
        for decoded in self.decoder.decode(chunk) {
            match decoded {
                Ok(msg) => {
                    handled += 1;
                    let controller_id = msg.controller_id;
                    if let Err(e) = self.dispatch(model, msg) {
                        warn!("Message from node {} failed: {}", controller_id, e);
                        self.report(Some(controller_id), &e);
                    }
                    if let Some(node) = model.node_mut(controller_id) {
                        node.message_counter += 1;
                    }
                }
                Err(InvalidFrame {
                    controller_id,
                    error,
                }) => {
                    warn!("Invalid frame from node {}: {}", controller_id, error);
                    if let Some(node) = model.node_mut(controller_id) {
                        node.message_counter += 1;
                        node.invalid_counter += 1;
                    }
                    self.report(Some(controller_id), &DispatchError::Frame(error));
                }
            }
        }
        handled
    }

    fn report(&mut self, node_id: Option<u8>, err: &DispatchError) {
        self.events.emit(DispatchEvent::Error {
            node_id,
            message: err.to_string(),
        });
    }

    /// Apply one message to the model
    pub fn dispatch(&mut self, model: &mut Model, msg: ProtocolMessage) -> Result<(), DispatchError> {
        debug!(
            "Dispatch {:?} from node {} (msg {})",
            msg.command, msg.controller_id, msg.message_id
        );
        match msg.command {
            Command::GetVersion => self.on_version(model, &msg),
            Command::GetInfo => self.on_info(model, &msg),
            Command::QueryRegister => self.on_query_register(model, &msg),
            Command::WriteRegister => self.on_write_register(&msg),
            Command::ConfigChannel => self.on_config_channel(model, &msg),
            Command::Decimation => self.on_decimation(model, &msg),
            Command::ReadChannelData => self.on_channel_data(model, &msg),
            Command::DebugString => self.on_debug_string(&msg),
            Command::Tracing => self.on_trace(&msg),
            Command::ResetTime => {
                debug!("Node {} reset its time base", msg.controller_id);
                Ok(())
            }
            Command::EmbeddedConfiguration => {
                debug!(
                    "Embedded configuration from node {}: {} bytes",
                    msg.controller_id,
                    msg.payload.len()
                );
                Ok(())
            }
        }
    }

    fn on_version(&mut self, model: &mut Model, msg: &ProtocolMessage) -> Result<(), DispatchError> {
        let version = VersionMessage::from_payload(&msg.payload)?;
        let node = model.add_node(CpuNode::new(
            msg.controller_id,
            version.protocol_version,
            version.application_version,
            &version.name,
            &version.serial_number,
        ))?;
        info!(
            "Found node {} '{}' (protocol {}, application {})",
            node.id, node.name, node.protocol_version, node.application_version
        );
        self.events.emit(DispatchEvent::NodeFound { node_id: node.id });

        let key = LayoutKey::new(&self.config.connector_name, node);
        match self.layouts.load(&key) {
            Ok(Some(layout)) => match node.load_registers(layout.to_registers()) {
                Ok(()) => {
                    info!("Node {} configured with {} registers", node.id, node.registers.len());
                    self.events.emit(DispatchEvent::NodeConfigured {
                        node_id: node.id,
                        registers: node.registers.len(),
                    });
                }
                Err(e) => {
                    warn!("Layout {} is invalid: {}", key.file_stem(), e);
                    self.report(Some(msg.controller_id), &DispatchError::Model(e));
                }
            },
            Ok(None) => warn!("No layout found for {}", key.file_stem()),
            Err(e) => {
                warn!("Failed to load layout {}: {}", key.file_stem(), e);
                self.report(Some(msg.controller_id), &DispatchError::Layout(e));
            }
        }

        let node_id = msg.controller_id;
        self.request_info(model, node_id)?;
        if self.config.reset_channels_on_discovery {
            self.reset_channels(model, node_id)?;
        }
        Ok(())
    }

    fn on_info(&mut self, model: &mut Model, msg: &ProtocolMessage) -> Result<(), DispatchError> {
        let info = InfoMessage::from_payload(&msg.payload)?;
        let node = model.require(msg.controller_id)?;
        node.apply_info(&info.entries);
        debug!("Node {} reported {} primitive sizes", node.id, info.entries.len());
        Ok(())
    }

    fn on_query_register(
        &mut self,
        model: &mut Model,
        msg: &ProtocolMessage,
    ) -> Result<(), DispatchError> {
        let query = QueryRegisterMessage::from_payload(&msg.payload)?;
        let value = query.value.ok_or(DispatchError::ReadFailed)?;

        let node = model.require(msg.controller_id)?;
        let control = ControlByte::decode(node.protocol_version, query.control)?;
        let register = node
            .registers
            .find_register_mut(query.offset, control.direction)
            .ok_or(ModelError::NoMatchingRegister {
                offset: query.offset,
            })?;

        let value = register.add_value(&value, None).clone();
        self.events.emit(DispatchEvent::ValueReceived {
            node_id: msg.controller_id,
            register_id: register.id,
            value,
            timestamp: None,
        });
        Ok(())
    }

    fn on_write_register(&mut self, msg: &ProtocolMessage) -> Result<(), DispatchError> {
        let ack = WriteResultMessage::from_payload(&msg.payload)?;
        if !ack.is_ok() {
            warn!("Node {} rejected a write: {}", msg.controller_id, ack.result);
        }
        self.events.emit(DispatchEvent::WriteAcknowledged {
            node_id: msg.controller_id,
            result: ack.result,
        });
        Ok(())
    }

    fn on_config_channel(
        &mut self,
        model: &mut Model,
        msg: &ProtocolMessage,
    ) -> Result<(), DispatchError> {
        let config = ConfigChannelMessage::from_payload(&msg.payload)?;
        let mode = config
            .mode
            .ok_or(PayloadError::TooShort(Command::ConfigChannel))?;

        let node = model.require(msg.controller_id)?;
        let register_id = match config.register {
            Some(bound) => {
                let control = ControlByte::decode(node.protocol_version, bound.control)?;
                let register = node
                    .find_register(bound.offset, control.direction)
                    .ok_or(ModelError::NoMatchingRegister {
                        offset: bound.offset,
                    })?;
                Some(register.id)
            }
            None => None,
        };
        node.set_channel(config.channel, mode, register_id)?;

        self.events.emit(DispatchEvent::ChannelConfigured {
            node_id: msg.controller_id,
            channel: config.channel,
            mode,
        });
        Ok(())
    }

    fn on_decimation(&mut self, model: &mut Model, msg: &ProtocolMessage) -> Result<(), DispatchError> {
        let decimation = DecimationMessage::from_payload(&msg.payload)?
            .decimation
            .ok_or(PayloadError::TooShort(Command::Decimation))?;
        model.require(msg.controller_id)?.decimation = Some(decimation);
        debug!("Node {} decimation {}", msg.controller_id, decimation);
        Ok(())
    }

    fn on_channel_data(
        &mut self,
        model: &mut Model,
        msg: &ProtocolMessage,
    ) -> Result<(), DispatchError> {
        let sample = ReadChannelDataMessage::from_payload(&msg.payload)?;
        let node = model.require(msg.controller_id)?;

        let values = sample.channel_values(|channel| {
            node.channel(channel).map(|slot| slot.size as usize)
        })?;
        let updates: Vec<(u32, &[u8])> = values
            .into_iter()
            .filter_map(|(channel, bytes)| node.channel(channel).map(|slot| (slot.register_id, bytes)))
            .collect();

        for (register_id, bytes) in updates {
            let Some(register) = node.registers.get_mut(register_id) else {
                continue;
            };
            let value = register.add_value(bytes, Some(sample.timestamp)).clone();
            self.events.emit(DispatchEvent::ValueReceived {
                node_id: msg.controller_id,
                register_id,
                value,
                timestamp: Some(sample.timestamp),
            });
        }
        Ok(())
    }

    fn on_debug_string(&mut self, msg: &ProtocolMessage) -> Result<(), DispatchError> {
        if msg.payload.is_empty() {
            return Err(PayloadError::TooShort(Command::DebugString).into());
        }
        let text = DebugStringMessage::from_payload(&msg.payload)?.text;
        self.events.emit(DispatchEvent::TerminalText {
            node_id: msg.controller_id,
            text,
        });
        Ok(())
    }

    fn on_trace(&mut self, msg: &ProtocolMessage) -> Result<(), DispatchError> {
        let trace = TraceMessage::from_payload(&msg.payload)?;
        self.events.emit(DispatchEvent::TraceReceived {
            node_id: msg.controller_id,
            level: trace.level,
            message: trace.message,
        });
        Ok(())
    }
}
