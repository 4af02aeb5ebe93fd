//! Message encoding and stream decoding
//!
//! Transports hand over byte chunks with no regard for frame boundaries.
//! [`decode_messages`] extracts every complete frame from a chunk and returns
//! the unconsumed tail, which the caller prepends to the next chunk.
//! [`MessageDecoder`] keeps that tail for a single connection.

use alloc::vec::Vec;

use crate::checksum::{crc8, frame_crc};
use crate::command::Command;
use crate::frame::{unescape, wrap, FrameError, ETX, MIN_FRAME_SIZE, STX};

/// Minimum distance between STX and ETX for a candidate frame
const MIN_DELIMITER_GAP: usize = 4;

/// One decoded protocol message
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProtocolMessage {
    /// Node the message is addressed to or sent by
    pub controller_id: u8,
    /// Per-node message id
    pub message_id: u8,
    /// Command
    pub command: Command,
    /// Command data (unescaped, without CRC)
    pub payload: Vec<u8>,
}

/// A frame that was delimited correctly but failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidFrame {
    /// Controller id byte found in the frame (0 if the frame was too short)
    pub controller_id: u8,
    /// Why the frame was rejected
    pub error: FrameError,
}

/// Result of decoding a single frame
pub type DecodedMessage = Result<ProtocolMessage, InvalidFrame>;

impl ProtocolMessage {
    /// Create a new message
    pub fn new(controller_id: u8, message_id: u8, command: Command, payload: Vec<u8>) -> Self {
        Self {
            controller_id,
            message_id,
            command,
            payload,
        }
    }

    /// Create a message without command data
    pub fn empty(controller_id: u8, message_id: u8, command: Command) -> Self {
        Self::new(controller_id, message_id, command, Vec::new())
    }

    /// Encode into a delimited, escaped frame
    pub fn encode(&self) -> Vec<u8> {
        encode_message(self)
    }

    /// Build a message from an unescaped frame
    fn from_frame(frame: &[u8]) -> Result<Self, FrameError> {
        if let Some(error) = validate(frame) {
            return Err(error);
        }
        let command = Command::from_byte(frame[3]).ok_or(FrameError::UnknownCommand)?;
        Ok(Self {
            controller_id: frame[1],
            message_id: frame[2],
            command,
            payload: frame[4..frame.len() - 2].to_vec(),
        })
    }
}

/// Encode a message into a delimited, escaped frame
pub fn encode_message(msg: &ProtocolMessage) -> Vec<u8> {
    let mut body = Vec::with_capacity(msg.payload.len() + 4);
    body.push(msg.controller_id);
    body.push(msg.message_id);
    body.push(msg.command.to_byte());
    body.extend_from_slice(&msg.payload);
    body.push(crc8(&body));
    wrap(&body)
}

/// Check an unescaped frame for structural problems
///
/// Returns `None` if the frame is acceptable. Checks run in order: length,
/// STX, ETX, checksum, command byte. The checksum is checked before the
/// command byte so that any corrupted byte is reported as a CRC failure.
pub fn validate(frame: &[u8]) -> Option<FrameError> {
    if frame.len() < MIN_FRAME_SIZE {
        return Some(FrameError::TooShort);
    }
    if frame[0] != STX {
        return Some(FrameError::MissingStx);
    }
    if frame[frame.len() - 1] != ETX {
        return Some(FrameError::MissingEtx);
    }
    if frame[frame.len() - 2] != frame_crc(frame) {
        return Some(FrameError::CrcFailed);
    }
    if Command::from_byte(frame[3]).is_none() {
        return Some(FrameError::UnknownCommand);
    }
    None
}

/// Decode one escaped STX..ETX slice
fn decode_frame(raw: &[u8]) -> DecodedMessage {
    let frame = unescape(raw);
    ProtocolMessage::from_frame(&frame).map_err(|error| InvalidFrame {
        controller_id: frame.get(1).copied().unwrap_or(0),
        error,
    })
}

/// Locate the next candidate frame in `data`
///
/// Returns `(stx, etx)` where `stx` is the last STX before the first ETX
/// that follows an STX. Leading garbage and truncated frames are skipped
/// this way.
fn find_frame(data: &[u8]) -> Option<(usize, usize)> {
    let mut stx = None;
    for (i, &byte) in data.iter().enumerate() {
        match byte {
            STX => stx = Some(i),
            ETX => {
                if let Some(start) = stx {
                    return Some((start, i));
                }
            }
            _ => {}
        }
    }
    None
}

/// Extract all complete frames from `remainder` followed by `input`
///
/// Returns the decoded messages in stream order and the bytes to carry
/// over to the next call. Frames with fewer than four bytes between STX and
/// ETX are dropped silently; frames that fail validation are returned as
/// [`InvalidFrame`] and do not stop extraction of later frames.
pub fn decode_messages(input: &[u8], remainder: &[u8]) -> (Vec<DecodedMessage>, Vec<u8>) {
    let mut data = Vec::with_capacity(remainder.len() + input.len());
    data.extend_from_slice(remainder);
    data.extend_from_slice(input);

    let mut messages = Vec::new();
    let mut start = 0;

    while start < data.len() {
        let window = &data[start..];
        let Some((stx, etx)) = find_frame(window) else {
            return (messages, window.to_vec());
        };

        if stx + MIN_DELIMITER_GAP < etx {
            messages.push(decode_frame(&window[stx..=etx]));
        }
        start += etx + 1;
    }

    (messages, Vec::new())
}

/// Stream decoder owning the remainder of one connection
#[derive(Debug, Clone, Default)]
pub struct MessageDecoder {
    remainder: Vec<u8>,
}

impl MessageDecoder {
    /// Create a decoder with an empty remainder
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a chunk, carrying any partial frame over to the next call
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<DecodedMessage> {
        let (messages, remainder) = decode_messages(chunk, &self.remainder);
        self.remainder = remainder;
        messages
    }

    /// Bytes waiting for the rest of a frame
    pub fn remainder(&self) -> &[u8] {
        &self.remainder
    }

    /// Drop any buffered partial frame
    pub fn reset(&mut self) {
        self.remainder.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ESC;
    use alloc::vec;
    use proptest::prelude::*;

    fn valid_messages(input: &[u8]) -> Vec<ProtocolMessage> {
        let (messages, _) = decode_messages(input, &[]);
        messages.into_iter().filter_map(Result::ok).collect()
    }

    #[test]
    fn test_encode_get_version() {
        let msg = ProtocolMessage::empty(0x01, 0x02, Command::GetVersion);
        assert_eq!(msg.encode(), vec![STX, 0x01, 0x02, 0x56, 0x3C, ETX]);
    }

    #[test]
    fn test_encode_escaped_ids() {
        let msg = ProtocolMessage::empty(ESC, ESC, Command::ConfigChannel);
        let output = msg.encode();

        assert_eq!(output.len(), 8);
        assert_eq!(output[1], ESC);
        assert_eq!(output[2] ^ ESC, ESC);
        assert_eq!(output[3], ESC);
        assert_eq!(output[4] ^ ESC, ESC);
        assert_eq!(output[5], 0x43);
    }

    #[test]
    fn test_encode_delimiter_ids() {
        let msg = ProtocolMessage::empty(STX, ETX, Command::ConfigChannel);
        let output = msg.encode();

        assert_eq!(output[1], ESC);
        assert_eq!(output[2] ^ ESC, STX);
        assert_eq!(output[3], ESC);
        assert_eq!(output[4] ^ ESC, ETX);
    }

    #[test]
    fn test_decode_single() {
        let msg = ProtocolMessage::new(0x03, 0x09, Command::DebugString, b"hello".to_vec());
        let (messages, remainder) = decode_messages(&msg.encode(), &[]);

        assert_eq!(messages, vec![Ok(msg)]);
        assert!(remainder.is_empty());
    }

    #[test]
    fn test_decode_incomplete_keeps_remainder() {
        let encoded = ProtocolMessage::empty(0x01, 0x00, Command::GetInfo).encode();
        let (messages, remainder) = decode_messages(&encoded[..3], &[]);

        assert!(messages.is_empty());
        assert_eq!(remainder, encoded[..3].to_vec());
    }

    #[test]
    fn test_decode_skips_leading_garbage() {
        let msg = ProtocolMessage::empty(0x01, 0x05, Command::ResetTime);
        let mut data = vec![0x00, 0x12, ETX, STX, 0x01];
        data.extend_from_slice(&msg.encode());

        assert_eq!(valid_messages(&data), vec![msg]);
    }

    #[test]
    fn test_decode_drops_short_frame() {
        let (messages, remainder) = decode_messages(&[STX, 0x01, 0x02, ETX], &[]);
        assert!(messages.is_empty());
        assert!(remainder.is_empty());
    }

    #[test]
    fn test_decode_reports_bad_crc() {
        let mut encoded = ProtocolMessage::empty(0x07, 0x01, Command::GetVersion).encode();
        let crc_index = encoded.len() - 2;
        encoded[crc_index] ^= 0x01;

        let (messages, _) = decode_messages(&encoded, &[]);
        assert_eq!(
            messages,
            vec![Err(InvalidFrame {
                controller_id: 0x07,
                error: FrameError::CrcFailed,
            })]
        );
    }

    #[test]
    fn test_bad_frame_does_not_block_next() {
        let mut bad = ProtocolMessage::empty(0x01, 0x01, Command::GetVersion).encode();
        bad[3] = 0x00;
        let good = ProtocolMessage::empty(0x02, 0x02, Command::GetVersion);

        let mut data = bad.clone();
        data.extend_from_slice(&good.encode());

        let (messages, _) = decode_messages(&data, &[]);
        assert_eq!(messages.len(), 2);
        assert!(messages[0].is_err());
        assert_eq!(messages[1], Ok(good));
    }

    #[test]
    fn test_validate_reasons() {
        assert_eq!(validate(&[STX, 1, 2, ETX]), Some(FrameError::TooShort));
        assert_eq!(
            validate(&[0x00, 1, 2, 0x56, 0, ETX]),
            Some(FrameError::MissingStx)
        );
        assert_eq!(
            validate(&[STX, 1, 2, 0x56, 0, 0x00]),
            Some(FrameError::MissingEtx)
        );

        let body = [0x01, 0x02, 0x7E];
        let frame = [STX, 0x01, 0x02, 0x7E, crc8(&body), ETX];
        assert_eq!(validate(&frame), Some(FrameError::UnknownCommand));

        let frame = [STX, 0x01, 0x02, 0x56, 0x3C, ETX];
        assert_eq!(validate(&frame), None);
    }

    #[test]
    fn test_decoder_carries_remainder() {
        let msg = ProtocolMessage::new(0x01, 0x02, Command::Tracing, vec![2, b'o', b'k']);
        let encoded = msg.encode();
        let mut decoder = MessageDecoder::new();

        assert!(decoder.decode(&encoded[..4]).is_empty());
        assert_eq!(decoder.remainder(), &encoded[..4]);
        assert_eq!(decoder.decode(&encoded[4..]), vec![Ok(msg)]);
        assert!(decoder.remainder().is_empty());
    }

    #[test]
    fn test_decoder_reset() {
        let mut decoder = MessageDecoder::new();
        decoder.decode(&[STX, 0x01]);
        decoder.reset();
        assert!(decoder.remainder().is_empty());
    }

    fn arb_command() -> impl Strategy<Value = Command> {
        proptest::sample::select(Command::ALL.to_vec())
    }

    fn arb_message() -> impl Strategy<Value = ProtocolMessage> {
        (
            any::<u8>(),
            any::<u8>(),
            arb_command(),
            proptest::collection::vec(any::<u8>(), 0..48),
        )
            .prop_map(|(ctrl, msg, command, payload)| {
                ProtocolMessage::new(ctrl, msg, command, payload)
            })
    }

    proptest! {
        #[test]
        fn prop_roundtrip(msg in arb_message()) {
            let (messages, remainder) = decode_messages(&msg.encode(), &[]);
            prop_assert_eq!(messages, vec![Ok(msg)]);
            prop_assert!(remainder.is_empty());
        }

        #[test]
        fn prop_reserved_bytes_survive(
            payload in proptest::collection::vec(
                proptest::sample::select(vec![STX, ETX, ESC, 0x00, 0xFF]),
                0..32,
            )
        ) {
            let msg = ProtocolMessage::new(STX, ESC, Command::WriteRegister, payload);
            let encoded = msg.encode();

            prop_assert_eq!(encoded.iter().filter(|&&b| b == STX).count(), 1);
            prop_assert_eq!(encoded.iter().filter(|&&b| b == ETX).count(), 1);
            prop_assert_eq!(valid_messages(&encoded), vec![msg]);
        }

        #[test]
        fn prop_split_anywhere(msg in arb_message(), split in any::<prop::sample::Index>()) {
            let encoded = msg.encode();
            let at = split.index(encoded.len() + 1);

            let (first, remainder) = decode_messages(&encoded[..at], &[]);
            let (second, rest) = decode_messages(&encoded[at..], &remainder);

            let mut combined = first;
            combined.extend(second);
            prop_assert_eq!(combined, vec![Ok(msg)]);
            prop_assert!(rest.is_empty());
        }

        #[test]
        fn prop_multiple_frames_in_order(
            msgs in proptest::collection::vec(arb_message(), 1..8)
        ) {
            let mut data = Vec::new();
            for msg in &msgs {
                data.extend_from_slice(&msg.encode());
            }
            prop_assert_eq!(valid_messages(&data), msgs);
        }

        #[test]
        fn prop_single_byte_corruption_fails_crc(
            msg in arb_message(),
            pos in any::<prop::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let body_len = msg.payload.len() + 4;
            let mut frame = Vec::with_capacity(body_len + 2);
            frame.push(STX);
            frame.push(msg.controller_id);
            frame.push(msg.message_id);
            frame.push(msg.command.to_byte());
            frame.extend_from_slice(&msg.payload);
            frame.push(crc8(&frame[1..]));
            frame.push(ETX);
            prop_assert_eq!(validate(&frame), None);

            // Corrupt one byte between the delimiters
            let index = 1 + pos.index(body_len);
            frame[index] ^= flip;
            prop_assert_eq!(validate(&frame), Some(FrameError::CrcFailed));
        }
    }
}
