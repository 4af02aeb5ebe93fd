//! Raw byte formatting and display-format specific text to byte conversion
//!
//! All byte slices are little-endian; text shows the most significant byte
//! first.

use std::fmt::Write;

use super::ValueError;

/// `0x` followed by upper-case hex digits, most significant byte first
pub fn hex_string(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "0x0".to_string();
    }
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for byte in bytes.iter().rev() {
        let _ = write!(out, "{:02X}", byte);
    }
    out
}

/// `0b` followed by nibble groups, leading zero groups removed
pub fn bin_string(bytes: &[u8]) -> String {
    let groups: Vec<String> = bytes
        .iter()
        .rev()
        .map(|byte| format!("{:04b} {:04b}", byte >> 4, byte & 0x0F))
        .collect();
    let joined = groups.join(" ");
    let trimmed = joined.trim_start_matches(['0', ' ']);
    if trimmed.is_empty() {
        "0b0".to_string()
    } else {
        format!("0b{}", trimmed)
    }
}

/// Signed decimal of a little-endian two's complement number of any length
pub fn dec_string(bytes: &[u8]) -> String {
    let Some(&top) = bytes.last() else {
        return "0".to_string();
    };
    let negative = top & 0x80 != 0;

    // Magnitude as little-endian bytes
    let mut magnitude = bytes.to_vec();
    if negative {
        let mut carry = true;
        for byte in magnitude.iter_mut() {
            *byte = !*byte;
            if carry {
                let (sum, overflow) = byte.overflowing_add(1);
                *byte = sum;
                carry = overflow;
            }
        }
    }

    // Repeated division by ten, most significant byte first
    let mut digits = Vec::new();
    while magnitude.iter().any(|&b| b != 0) {
        let mut remainder = 0u16;
        for byte in magnitude.iter_mut().rev() {
            let current = (remainder << 8) | *byte as u16;
            *byte = (current / 10) as u8;
            remainder = current % 10;
        }
        digits.push(b'0' + remainder as u8);
    }
    if digits.is_empty() {
        digits.push(b'0');
    }
    if negative {
        digits.push(b'-');
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

fn strip_separators(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .collect()
}

/// Bytes from hex digits; an odd digit count gets a leading zero
pub fn hex_bytes(text: &str) -> Result<Vec<u8>, ValueError> {
    let mut digits = strip_separators(text);
    if let Some(rest) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        digits = rest.to_string();
    }
    if digits.len() % 2 != 0 {
        digits.insert(0, '0');
    }

    let mut bytes = Vec::with_capacity(digits.len() / 2);
    for chunk in digits.as_bytes().chunks(2).rev() {
        let pair = std::str::from_utf8(chunk).map_err(|_| ValueError::InvalidFormat("hex"))?;
        let byte = u8::from_str_radix(pair, 16).map_err(|_| ValueError::InvalidFormat("hex"))?;
        bytes.push(byte);
    }
    Ok(bytes)
}

/// Bytes from binary digits in whole groups of eight
pub fn bin_bytes(text: &str) -> Result<Vec<u8>, ValueError> {
    let mut digits = strip_separators(text);
    if let Some(rest) = digits
        .strip_prefix("0b")
        .or_else(|| digits.strip_prefix("0B"))
    {
        digits = rest.to_string();
    }
    if digits.len() % 8 != 0 {
        return Err(ValueError::InvalidFormat("binary digits must come in groups of 8"));
    }

    let mut bytes = Vec::with_capacity(digits.len() / 8);
    for chunk in digits.as_bytes().chunks(8).rev() {
        let group = std::str::from_utf8(chunk).map_err(|_| ValueError::InvalidFormat("binary"))?;
        let byte = u8::from_str_radix(group, 2).map_err(|_| ValueError::InvalidFormat("binary"))?;
        bytes.push(byte);
    }
    Ok(bytes)
}

/// Shortest little-endian two's complement bytes of a decimal integer
pub fn dec_bytes(text: &str) -> Result<Vec<u8>, ValueError> {
    let digits: String = text.chars().filter(|c| !matches!(c, ' ' | '_')).collect();
    let value: i128 = digits
        .parse()
        .map_err(|_| ValueError::InvalidFormat("decimal"))?;

    let mut bytes = value.to_le_bytes().to_vec();
    // Drop sign-extension bytes that carry no information
    while bytes.len() > 1 {
        let top = bytes[bytes.len() - 1];
        let next = bytes[bytes.len() - 2];
        let redundant = (top == 0x00 && next & 0x80 == 0) || (top == 0xFF && next & 0x80 != 0);
        if !redundant {
            break;
        }
        bytes.pop();
    }
    Ok(bytes)
}

/// ASCII bytes, non-ASCII characters replaced by `?`
pub fn ascii_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect()
}

/// ASCII text, non-ASCII bytes replaced by `?`
pub fn ascii_string(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if b.is_ascii() { b as char } else { '?' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_string() {
        assert_eq!(hex_string(&[0x34, 0x12]), "0x1234");
        assert_eq!(hex_string(&[0x0A, 0x00, 0x00, 0x00]), "0x0000000A");
        assert_eq!(hex_string(&[]), "0x0");
    }

    #[test]
    fn test_bin_string() {
        assert_eq!(bin_string(&[0x05]), "0b101");
        assert_eq!(bin_string(&[0x00, 0x81]), "0b1000 0001 0000 0000");
        assert_eq!(bin_string(&[0x00, 0x00]), "0b0");
    }

    #[test]
    fn test_dec_string() {
        assert_eq!(dec_string(&[0x34, 0x12]), "4660");
        assert_eq!(dec_string(&[0xFF]), "-1");
        assert_eq!(dec_string(&[0x00, 0x80]), "-32768");
        assert_eq!(dec_string(&[]), "0");
        assert_eq!(dec_string(&[0xFF; 16]), "-1");
        assert_eq!(
            dec_string(&[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]),
            "340282366920938463463374607431768211456"
        );
    }

    #[test]
    fn test_hex_bytes() {
        assert_eq!(hex_bytes("1234").unwrap(), vec![0x34, 0x12]);
        assert_eq!(hex_bytes("0x123").unwrap(), vec![0x23, 0x01]);
        assert_eq!(hex_bytes("AB-CD").unwrap(), vec![0xCD, 0xAB]);
        assert!(hex_bytes("XY").is_err());
    }

    #[test]
    fn test_bin_bytes() {
        assert_eq!(bin_bytes("0000 0001 1000 0000").unwrap(), vec![0x80, 0x01]);
        assert!(bin_bytes("101").is_err());
    }

    #[test]
    fn test_dec_bytes() {
        assert_eq!(dec_bytes("4660").unwrap(), vec![0x34, 0x12]);
        assert_eq!(dec_bytes("-1").unwrap(), vec![0xFF]);
        assert_eq!(dec_bytes("128").unwrap(), vec![0x80, 0x00]);
        assert_eq!(dec_bytes("0").unwrap(), vec![0x00]);
        assert!(dec_bytes("1.5").is_err());
    }

    #[test]
    fn test_ascii() {
        assert_eq!(ascii_bytes("Aé"), vec![b'A', b'?']);
        assert_eq!(ascii_string(&[b'o', b'k', 0xC3]), "ok?");
    }
}
