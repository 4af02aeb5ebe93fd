//! Text to number parsing
//!
//! Integers are accumulated modulo 2^128 and narrowed with `as`, so values
//! that do not fit the target register wrap around instead of failing.

/// Normalize user input before parsing
///
/// Strips spaces and `_`, turns `,` into `.` and lowercases a leading
/// `0X`/`0B` prefix.
pub fn preformat(text: &str) -> String {
    let mut out: String = text
        .trim()
        .chars()
        .filter(|c| *c != ' ' && *c != '_')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if out.starts_with("0X") {
        out.replace_range(..2, "0x");
    } else if out.starts_with("0B") {
        out.replace_range(..2, "0b");
    }
    out
}

fn accumulate(digits: &str, radix: u32) -> Option<u128> {
    let mut value = 0u128;
    for c in digits.chars() {
        let digit = c.to_digit(radix)?;
        value = value
            .wrapping_mul(radix as u128)
            .wrapping_add(digit as u128);
    }
    Some(value)
}

/// Parse a decimal integer with optional sign, zero fraction and exponent
fn parse_decimal(text: &str) -> Option<u128> {
    let (negative, body) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };

    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(at) => (&body[..at], Some(&body[at + 1..])),
        None => (body, None),
    };

    let (whole, fraction) = match mantissa.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (mantissa, ""),
    };
    if whole.is_empty() || !fraction.chars().all(|c| c == '0') {
        return None;
    }

    let mut value = accumulate(whole, 10)?;

    if let Some(exponent) = exponent {
        let exponent = exponent.strip_prefix('+').unwrap_or(exponent);
        if exponent.is_empty() || !exponent.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        // 10^n is a multiple of 2^128 once n reaches 128
        let exponent: u32 = exponent.parse().unwrap_or(u32::MAX);
        value = if exponent >= 128 {
            0
        } else {
            value.wrapping_mul(10u128.wrapping_pow(exponent))
        };
    }

    Some(if negative { value.wrapping_neg() } else { value })
}

/// Parse hex (`0x`), binary (`0b`) or decimal text into a two's complement
/// 128-bit pattern
pub fn parse_integer(text: &str) -> Option<u128> {
    let text = preformat(text);
    if let Some(hex) = text.strip_prefix("0x") {
        if hex.is_empty() {
            return None;
        }
        accumulate(hex, 16)
    } else if let Some(bin) = text.strip_prefix("0b") {
        // "0b" alone is zero
        accumulate(bin, 2)
    } else {
        parse_decimal(&text)
    }
}

/// Why text is not a usable number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberError {
    /// Not a number at all
    Invalid,
    /// A number too large for the target
    OutOfRange,
}

fn accumulate_checked(digits: &str, radix: u32) -> Result<u128, NumberError> {
    let mut value = 0u128;
    for c in digits.chars() {
        let digit = c.to_digit(radix).ok_or(NumberError::Invalid)?;
        value = value
            .checked_mul(radix as u128)
            .and_then(|v| v.checked_add(digit as u128))
            .ok_or(NumberError::OutOfRange)?;
    }
    Ok(value)
}

/// Parse a floating point value
///
/// `0x`/`0b` input is read as an unsigned integer; more than 128 bits of it
/// is out of range rather than wrapped.
pub fn parse_float(text: &str) -> Result<f64, NumberError> {
    let text = preformat(text);
    if let Some(hex) = text.strip_prefix("0x") {
        if hex.is_empty() {
            return Err(NumberError::Invalid);
        }
        accumulate_checked(hex, 16).map(|value| value as f64)
    } else if let Some(bin) = text.strip_prefix("0b") {
        accumulate_checked(bin, 2).map(|value| value as f64)
    } else {
        text.parse::<f64>().map_err(|_| NumberError::Invalid)
    }
}

/// Parse `true`/`false` (any case) or an integer, non-zero meaning true
pub fn parse_bool(text: &str) -> Option<bool> {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Some(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        parse_integer(trimmed).map(|value| value != 0)
    }
}
