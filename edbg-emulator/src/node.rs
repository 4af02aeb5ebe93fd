//! Emulated node state and request handling

use std::collections::BTreeMap;

use edbg_protocol::messages::{
    ConfigChannelMessage, DebugStringMessage, DecimationMessage, InfoEntry, InfoMessage,
    QueryRegisterMessage, ReadChannelDataMessage, VersionMessage, WriteRegisterMessage,
    WriteResultMessage, MAX_DEBUG_CHANNELS,
};
use edbg_protocol::{
    ChannelMode, Command, CommandPayload, ControlByte, Direction, MessageDecoder, PayloadError,
    ProtocolMessage, VariableType, Version,
};
use tracing::{debug, info, trace, warn};

/// LowSpeed channels are sampled on every n-th eligible tick
pub const LOW_SPEED_DIVIDER: u32 = 20;

/// Broadcast controller id
const BROADCAST_ID: u8 = 0xFF;

const WRITE_OK: u8 = 0x00;
const WRITE_FAILED: u8 = 0x01;

// ReadChannelData request codes
const STREAM_STOP: u8 = 0x00;
const STREAM_START: u8 = 0x01;
const STREAM_ONCE: u8 = 0x02;

/// Register bound to a debug channel
#[derive(Debug, Clone)]
struct Binding {
    offset: u32,
    direction: Direction,
    size: u8,
    mode: ChannelMode,
    last_sent: Option<Vec<u8>>,
}

/// A simulated CPU node
#[derive(Debug)]
pub struct EmulatedNode {
    id: u8,
    identity: VersionMessage,
    info: InfoMessage,
    /// Register bytes by offset and direction bits
    registers: BTreeMap<(u32, u8), Vec<u8>>,
    channels: [Option<Binding>; MAX_DEBUG_CHANNELS as usize],
    decimation: u8,
    streaming: bool,
    time_ms: u32,
    ticks: u32,
    decoder: MessageDecoder,
    terminal: Vec<String>,
}

fn key(offset: u32, direction: Direction) -> (u32, u8) {
    (offset, direction.bits())
}

/// Primitive sizes of a 32-bit target with a 1 ms time base
fn default_info() -> InfoMessage {
    let entry = |var_type, size| InfoEntry { var_type, size };
    InfoMessage {
        entries: vec![
            entry(VariableType::MemoryAlignment, 1),
            entry(VariableType::Pointer, 4),
            entry(VariableType::Bool, 1),
            entry(VariableType::Char, 2),
            entry(VariableType::Short, 2),
            entry(VariableType::Int, 4),
            entry(VariableType::Long, 8),
            entry(VariableType::Float, 4),
            entry(VariableType::Double, 8),
            entry(VariableType::LongDouble, 8),
            entry(VariableType::TimeStamp, 1000),
        ],
    }
}

impl EmulatedNode {
    pub fn new(id: u8, identity: VersionMessage, info: InfoMessage) -> Self {
        Self {
            id,
            identity,
            info,
            registers: BTreeMap::new(),
            channels: Default::default(),
            decimation: 0,
            streaming: true,
            time_ms: 0,
            ticks: 0,
            decoder: MessageDecoder::new(),
            terminal: Vec::new(),
        }
    }

    /// Node `FOITN` speaking `protocol_version`, with the default size table
    pub fn with_protocol(id: u8, protocol_version: Version) -> Result<Self, PayloadError> {
        let identity = VersionMessage::new(protocol_version, Version::new(0, 0, 1), "FOITN", "001")?;
        Ok(Self::new(id, identity, default_info()))
    }

    /// Add a register holding `value`
    pub fn with_register(mut self, offset: u32, direction: Direction, value: &[u8]) -> Self {
        self.registers.insert(key(offset, direction), value.to_vec());
        self
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn protocol_version(&self) -> Version {
        self.identity.protocol_version
    }

    pub fn register(&self, offset: u32, direction: Direction) -> Option<&[u8]> {
        self.registers.get(&key(offset, direction)).map(Vec::as_slice)
    }

    pub fn set_register(&mut self, offset: u32, direction: Direction, value: &[u8]) {
        self.registers.insert(key(offset, direction), value.to_vec());
    }

    /// Console text received from the host
    pub fn terminal(&self) -> &[String] {
        &self.terminal
    }

    pub fn decimation(&self) -> u8 {
        self.decimation
    }

    /// Mode of a debug channel, Off if unbound
    pub fn channel_mode(&self, channel: u8) -> ChannelMode {
        self.channels
            .get(channel as usize)
            .and_then(Option::as_ref)
            .map_or(ChannelMode::Off, |b| b.mode)
    }

    /// Feed bytes from the host; returns the encoded responses
    pub fn receive(&mut self, chunk: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        for decoded in self.decoder.decode(chunk) {
            match decoded {
                Ok(msg) => {
                    if let Some(response) = self.handle(&msg) {
                        out.extend(response.encode());
                    }
                }
                Err(invalid) => warn!("Emulator dropped frame: {}", invalid.error),
            }
        }
        out
    }

    fn direction_of(&self, control: u8) -> Option<Direction> {
        match ControlByte::decode(self.identity.protocol_version, control) {
            Ok(control) => Some(control.direction),
            Err(e) => {
                warn!("Emulator cannot decode control byte: {}", e);
                None
            }
        }
    }

    /// Answer one request, if it is addressed to this node
    pub fn handle(&mut self, msg: &ProtocolMessage) -> Option<ProtocolMessage> {
        let broadcast = msg.controller_id == BROADCAST_ID && msg.command == Command::GetVersion;
        if msg.controller_id != self.id && !broadcast {
            return None;
        }
        trace!("Emulator {} handling {:?}", self.id, msg.command);

        let id = self.id;
        let echo = || ProtocolMessage::new(id, msg.message_id, msg.command, msg.payload.clone());
        match msg.command {
            Command::GetVersion => Some(self.identity.to_message(self.id, msg.message_id)),
            Command::GetInfo => Some(self.info.to_message(self.id, msg.message_id)),
            Command::QueryRegister => {
                let response = QueryRegisterMessage::from_payload(&msg.payload)
                    .ok()
                    .and_then(|query| {
                        let direction = self.direction_of(query.control)?;
                        let value = self.registers.get(&key(query.offset, direction))?;
                        Some(QueryRegisterMessage::response(query.offset, query.control, value))
                    });
                match response {
                    Some(response) => Some(response.to_message(self.id, msg.message_id)),
                    None => Some(echo()),
                }
            }
            Command::WriteRegister => {
                let result = match WriteRegisterMessage::from_payload(&msg.payload) {
                    Ok(write) => self.write(&write),
                    Err(e) => {
                        warn!("Emulator rejected write: {}", e);
                        WRITE_FAILED
                    }
                };
                Some(WriteResultMessage { result }.to_message(self.id, msg.message_id))
            }
            Command::ConfigChannel => {
                if let Ok(config) = ConfigChannelMessage::from_payload(&msg.payload) {
                    self.configure_channel(&config);
                }
                Some(echo())
            }
            Command::Decimation => {
                if let Ok(DecimationMessage {
                    decimation: Some(decimation),
                }) = DecimationMessage::from_payload(&msg.payload)
                {
                    debug!("Emulator decimation {}", decimation);
                    self.decimation = decimation;
                }
                let current = DecimationMessage {
                    decimation: Some(self.decimation),
                };
                Some(current.to_message(self.id, msg.message_id))
            }
            Command::ResetTime => {
                self.time_ms = 0;
                Some(echo())
            }
            Command::ReadChannelData => self.stream_request(msg),
            Command::DebugString => {
                let text = DebugStringMessage::from_payload(&msg.payload)
                    .map(|m| m.text)
                    .unwrap_or_default();
                info!("Emulator terminal: {}", text);
                self.terminal.push(text);
                Some(echo())
            }
            Command::Tracing | Command::EmbeddedConfiguration => None,
        }
    }

    /// Store written bytes in every register at the offset
    fn write(&mut self, write: &WriteRegisterMessage) -> u8 {
        let Some(direction) = self.direction_of(write.control) else {
            return WRITE_FAILED;
        };
        let mut found = false;
        for ((offset, _), value) in self.registers.iter_mut() {
            if *offset == write.offset {
                *value = write.value.clone();
                found = true;
            }
        }
        if !found {
            self.registers
                .insert(key(write.offset, direction), write.value.clone());
        }
        WRITE_OK
    }

    fn configure_channel(&mut self, config: &ConfigChannelMessage) {
        let index = config.channel as usize;
        if index >= self.channels.len() {
            warn!("Emulator has no channel {}", config.channel);
            return;
        }
        let mode = match config.mode {
            Some(ChannelMode::Off) => {
                self.channels[index] = None;
                return;
            }
            Some(mode) => mode,
            None => return,
        };

        match config.register {
            Some(register) => {
                let Some(direction) = self.direction_of(register.control) else {
                    return;
                };
                self.channels[index] = Some(Binding {
                    offset: register.offset,
                    direction,
                    size: register.size,
                    mode,
                    last_sent: None,
                });
            }
            None => {
                if let Some(binding) = self.channels[index].as_mut() {
                    binding.mode = mode;
                }
            }
        }
    }

    fn stream_request(&mut self, msg: &ProtocolMessage) -> Option<ProtocolMessage> {
        let echo = ProtocolMessage::new(self.id, msg.message_id, msg.command, msg.payload.clone());
        match msg.payload.as_slice() {
            [STREAM_STOP] => {
                self.streaming = false;
                Some(echo)
            }
            [STREAM_START] => {
                self.streaming = true;
                Some(echo)
            }
            [STREAM_ONCE] => {
                let samples = self.collect(|mode, _| mode == ChannelMode::Once);
                Some(self.sample_message(&samples).to_message(self.id, msg.message_id))
            }
            _ => Some(echo),
        }
    }

    /// Current bytes of a bound register, sized to the channel
    fn channel_value(&self, binding: &Binding) -> Vec<u8> {
        let mut value = self
            .registers
            .get(&key(binding.offset, binding.direction))
            .cloned()
            .unwrap_or_default();
        value.resize(binding.size as usize, 0);
        value
    }

    /// Values of all channels selected by `include(mode, changed)`
    fn collect<F>(&mut self, include: F) -> Vec<(u8, Vec<u8>)>
    where
        F: Fn(ChannelMode, bool) -> bool,
    {
        let mut samples = Vec::new();
        for channel in 0..MAX_DEBUG_CHANNELS {
            let Some(binding) = self.channels[channel as usize].clone() else {
                continue;
            };
            let value = self.channel_value(&binding);
            let changed = binding.last_sent.as_ref() != Some(&value);
            if include(binding.mode, changed) {
                if let Some(slot) = self.channels[channel as usize].as_mut() {
                    slot.last_sent = Some(value.clone());
                    if slot.mode == ChannelMode::Once {
                        slot.mode = ChannelMode::Off;
                    }
                }
                samples.push((channel, value));
            }
        }
        samples
    }

    fn sample_message(&self, samples: &[(u8, Vec<u8>)]) -> ReadChannelDataMessage {
        let channels: Vec<(u8, &[u8])> = samples
            .iter()
            .map(|(channel, value)| (*channel, value.as_slice()))
            .collect();
        ReadChannelDataMessage::from_channels(self.time_ms, &channels)
    }

    /// Advance time; returns an encoded ReadChannelData frame when a sample is due
    ///
    /// With decimation `d` only every `d + 1`-th tick is eligible. OnChange
    /// channels are sent when their value changed, LowSpeed channels on every
    /// [`LOW_SPEED_DIVIDER`]-th eligible tick and Once channels on the next
    /// eligible tick only.
    pub fn tick(&mut self, elapsed_ms: u32) -> Option<Vec<u8>> {
        self.time_ms = self.time_ms.wrapping_add(elapsed_ms);
        if !self.streaming {
            return None;
        }
        self.ticks = self.ticks.wrapping_add(1);

        let period = self.decimation as u32 + 1;
        if self.ticks % period != 0 {
            return None;
        }
        let low_speed = (self.ticks / period) % LOW_SPEED_DIVIDER == 0;

        let samples = self.collect(|mode, changed| match mode {
            ChannelMode::Off => false,
            ChannelMode::OnChange => changed,
            ChannelMode::LowSpeed => low_speed,
            ChannelMode::Once => true,
        });
        if samples.is_empty() {
            return None;
        }
        trace!("Emulator sample with {} channels", samples.len());
        Some(self.sample_message(&samples).to_message(self.id, 0).encode())
    }
}
