//! Frame delimiting and byte escaping
//!
//! Frame format (before escaping):
//! - STX (1 byte): 0x55 start delimiter
//! - CTRL ID (1 byte): controller/node id, 0xFF is broadcast
//! - MSG ID (1 byte): per-node message id
//! - CMD (1 byte): command identifier
//! - DATA (0..n bytes): command specific data
//! - CRC (1 byte): CRC-8 of CTRL ID, MSG ID, CMD and DATA
//! - ETX (1 byte): 0xAA end delimiter
//!
//! Any STX, ETX or ESC between the delimiters is replaced by `ESC, ESC ^ byte`.

use alloc::vec::Vec;
use core::fmt;

/// Frame start delimiter
pub const STX: u8 = 0x55;

/// Frame end delimiter
pub const ETX: u8 = 0xAA;

/// Escape marker
pub const ESC: u8 = 0x66;

/// Smallest valid unescaped frame (STX + CTRL + MSG + CMD + CRC + ETX)
pub const MIN_FRAME_SIZE: usize = 6;

/// Reasons a frame is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Fewer than [`MIN_FRAME_SIZE`] bytes
    TooShort,
    /// First byte is not STX
    MissingStx,
    /// Last byte is not ETX
    MissingEtx,
    /// Command byte is not a known command
    UnknownCommand,
    /// Checksum mismatch
    CrcFailed,
}

impl FrameError {
    /// Human readable reason, as reported to the user
    pub fn reason(&self) -> &'static str {
        match self {
            FrameError::TooShort => "Message too short",
            FrameError::MissingStx => "Message didn't start with STX",
            FrameError::MissingEtx => "Message didn't end with ETX",
            FrameError::UnknownCommand => "Unknown command",
            FrameError::CrcFailed => "CRC failed",
        }
    }
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Returns true if `byte` must be escaped inside a frame
pub fn is_reserved(byte: u8) -> bool {
    matches!(byte, STX | ETX | ESC)
}

/// Append `bytes` to `out`, escaping reserved bytes
pub fn escape_into(out: &mut Vec<u8>, bytes: &[u8]) {
    for &byte in bytes {
        if is_reserved(byte) {
            out.push(ESC);
            out.push(ESC ^ byte);
        } else {
            out.push(byte);
        }
    }
}

/// Wrap an unescaped frame body (`CTRL .. CRC`) into a delimited, escaped frame
pub fn wrap(body: &[u8]) -> Vec<u8> {
    // Worst case every byte is escaped
    let mut out = Vec::with_capacity(body.len() * 2 + 2);
    out.push(STX);
    escape_into(&mut out, body);
    out.push(ETX);
    out
}

/// Remove escaping from a delimited frame
///
/// `frame` starts with STX and ends with ETX. Scanning starts after the
/// leading STX; each ESC is dropped and the byte following it is XORed with
/// ESC. An ESC directly before ETX therefore consumes the ETX, which later
/// shows up as [`FrameError::MissingEtx`].
pub fn unescape(frame: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(frame.len());
    let mut bytes = frame.iter().copied();

    if let Some(first) = bytes.next() {
        out.push(first);
    }

    while let Some(byte) = bytes.next() {
        if byte == ESC {
            match bytes.next() {
                Some(next) => out.push(ESC ^ next),
                None => out.push(byte),
            }
        } else {
            out.push(byte);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_wrap_plain_body() {
        let framed = wrap(&[0x01, 0x02, 0x56, 0x10]);
        assert_eq!(framed, vec![STX, 0x01, 0x02, 0x56, 0x10, ETX]);
    }

    #[test]
    fn test_wrap_escapes_reserved_bytes() {
        let framed = wrap(&[STX, ETX, ESC]);
        assert_eq!(
            framed,
            vec![STX, ESC, ESC ^ STX, ESC, ESC ^ ETX, ESC, ESC ^ ESC, ETX]
        );
    }

    #[test]
    fn test_wrapped_frame_has_single_delimiters() {
        let framed = wrap(&[STX, STX, ETX, 0x00, ETX]);
        assert_eq!(framed.iter().filter(|&&b| b == STX).count(), 1);
        assert_eq!(framed.iter().filter(|&&b| b == ETX).count(), 1);
        assert_eq!(framed[0], STX);
        assert_eq!(framed[framed.len() - 1], ETX);
    }

    #[test]
    fn test_unescape_inverts_wrap() {
        let body = [ESC, 0x01, STX, 0x7F, ETX, ESC, ESC];
        let framed = wrap(&body);
        let plain = unescape(&framed);

        assert_eq!(plain[0], STX);
        assert_eq!(&plain[1..plain.len() - 1], &body);
        assert_eq!(plain[plain.len() - 1], ETX);
    }

    #[test]
    fn test_unescape_trailing_escape_swallows_etx() {
        let plain = unescape(&[STX, 0x01, ESC, ETX]);
        assert_eq!(plain, vec![STX, 0x01, ESC ^ ETX]);
    }

    #[test]
    fn test_unescape_lone_escape_at_end() {
        let plain = unescape(&[STX, 0x01, ESC]);
        assert_eq!(plain, vec![STX, 0x01, ESC]);
    }

    #[test]
    fn test_error_reasons() {
        assert_eq!(FrameError::TooShort.reason(), "Message too short");
        assert_eq!(FrameError::CrcFailed.reason(), "CRC failed");
    }
}
