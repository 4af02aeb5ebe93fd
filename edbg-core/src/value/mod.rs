//! Typed register values
//!
//! A [`RegisterValue`] is created from the raw bytes of a query response or
//! channel sample, from a native Rust value, or from text entered by a user.
//! Raw byte input shorter than the natural width of the type is padded with
//! zero bytes at the most significant end, so values are zero-extended and
//! never sign-extended. Strings drop trailing NUL padding.

mod format;
mod parse;

use std::fmt;

use edbg_protocol::VariableType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use format::{bin_string, dec_string, hex_string};
pub use parse::{parse_bool, parse_float, parse_integer, NumberError};

/// Errors converting into a register value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// A native value of the wrong type was assigned
    #[error("cannot assign a {found} to a {expected:?} register")]
    TypeMismatch {
        expected: VariableType,
        found: &'static str,
    },
    /// Text could not be parsed for the register type
    #[error("cannot parse {text:?} as {target:?}")]
    Parse { text: String, target: VariableType },
    /// Text is a number too large for the register type
    #[error("{text:?} is out of range for {target:?}")]
    OutOfRange { text: String, target: VariableType },
    /// Text does not match the selected display format
    #[error("invalid {0} input")]
    InvalidFormat(&'static str),
}

/// How a value is shown to or entered by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ValueDisplayFormat {
    /// Natural representation of the type
    #[default]
    Default,
    /// Signed decimal of the raw bytes
    Dec,
    /// Raw bytes as hex, most significant first
    Hex,
    /// Raw bytes as binary nibble groups
    Bin,
    /// Raw bytes as ASCII
    Char,
    /// Raw bytes as UTF-8
    Utf8,
}

/// A native value assigned programmatically
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
}

impl NativeValue {
    fn type_name(&self) -> &'static str {
        match self {
            NativeValue::Bool(_) => "bool",
            NativeValue::I8(_) => "i8",
            NativeValue::U8(_) => "u8",
            NativeValue::I16(_) => "i16",
            NativeValue::U16(_) => "u16",
            NativeValue::I32(_) => "i32",
            NativeValue::U32(_) => "u32",
            NativeValue::I64(_) => "i64",
            NativeValue::U64(_) => "u64",
            NativeValue::F32(_) => "f32",
            NativeValue::F64(_) => "f64",
            NativeValue::Str(_) => "string",
            NativeValue::Bytes(_) => "byte array",
        }
    }
}

macro_rules! native_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for NativeValue {
                fn from(value: $ty) -> Self {
                    NativeValue::$variant(value.into())
                }
            }
        )*
    };
}

native_from! {
    bool => Bool,
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => Str,
    &str => Str,
    Vec<u8> => Bytes,
}

/// A typed register value
#[derive(Debug, Clone, PartialEq)]
pub enum RegisterValue {
    Bool(bool),
    /// Single byte character
    Char(u8),
    SChar(i8),
    UChar(u8),
    Short(i16),
    UShort(u16),
    Int(i32),
    UInt(u32),
    Long(i64),
    ULong(u64),
    Float(f32),
    Double(f64),
    String(String),
    Blob(Vec<u8>),
}

/// Zero-pad `bytes` to `N`, or take the first `N` bytes
fn padded<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    let len = bytes.len().min(N);
    out[..len].copy_from_slice(&bytes[..len]);
    out
}

impl RegisterValue {
    /// Zero value of the variant used for `var_type`
    ///
    /// Pointers are treated as unsigned 32-bit values, long double as double
    /// and types without a numeric meaning as blobs.
    pub fn zero(var_type: VariableType) -> Self {
        match var_type {
            VariableType::Bool => RegisterValue::Bool(false),
            VariableType::Char => RegisterValue::Char(0),
            VariableType::SChar => RegisterValue::SChar(0),
            VariableType::UChar => RegisterValue::UChar(0),
            VariableType::Short => RegisterValue::Short(0),
            VariableType::UShort => RegisterValue::UShort(0),
            VariableType::Int => RegisterValue::Int(0),
            VariableType::UInt | VariableType::Pointer => RegisterValue::UInt(0),
            VariableType::Long => RegisterValue::Long(0),
            VariableType::ULong => RegisterValue::ULong(0),
            VariableType::Float => RegisterValue::Float(0.0),
            VariableType::Double | VariableType::LongDouble => RegisterValue::Double(0.0),
            VariableType::String => RegisterValue::String(String::new()),
            VariableType::MemoryAlignment
            | VariableType::TimeStamp
            | VariableType::Blob
            | VariableType::Unknown => RegisterValue::Blob(Vec::new()),
        }
    }

    /// Interpret raw little-endian bytes as `var_type`
    pub fn from_bytes(var_type: VariableType, bytes: &[u8]) -> Self {
        match Self::zero(var_type) {
            RegisterValue::Bool(_) => RegisterValue::Bool(bytes.first().is_some_and(|&b| b != 0)),
            RegisterValue::Char(_) => RegisterValue::Char(padded::<1>(bytes)[0]),
            RegisterValue::SChar(_) => RegisterValue::SChar(i8::from_le_bytes(padded(bytes))),
            RegisterValue::UChar(_) => RegisterValue::UChar(padded::<1>(bytes)[0]),
            RegisterValue::Short(_) => RegisterValue::Short(i16::from_le_bytes(padded(bytes))),
            RegisterValue::UShort(_) => RegisterValue::UShort(u16::from_le_bytes(padded(bytes))),
            RegisterValue::Int(_) => RegisterValue::Int(i32::from_le_bytes(padded(bytes))),
            RegisterValue::UInt(_) => RegisterValue::UInt(u32::from_le_bytes(padded(bytes))),
            RegisterValue::Long(_) => RegisterValue::Long(i64::from_le_bytes(padded(bytes))),
            RegisterValue::ULong(_) => RegisterValue::ULong(u64::from_le_bytes(padded(bytes))),
            RegisterValue::Float(_) => RegisterValue::Float(f32::from_le_bytes(padded(bytes))),
            RegisterValue::Double(_) => RegisterValue::Double(f64::from_le_bytes(padded(bytes))),
            RegisterValue::String(_) => {
                let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                RegisterValue::String(String::from_utf8_lossy(&bytes[..end]).into_owned())
            }
            RegisterValue::Blob(_) => RegisterValue::Blob(bytes.to_vec()),
        }
    }

    /// Raw little-endian bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            RegisterValue::Bool(v) => vec![*v as u8],
            RegisterValue::Char(v) | RegisterValue::UChar(v) => vec![*v],
            RegisterValue::SChar(v) => v.to_le_bytes().to_vec(),
            RegisterValue::Short(v) => v.to_le_bytes().to_vec(),
            RegisterValue::UShort(v) => v.to_le_bytes().to_vec(),
            RegisterValue::Int(v) => v.to_le_bytes().to_vec(),
            RegisterValue::UInt(v) => v.to_le_bytes().to_vec(),
            RegisterValue::Long(v) => v.to_le_bytes().to_vec(),
            RegisterValue::ULong(v) => v.to_le_bytes().to_vec(),
            RegisterValue::Float(v) => v.to_le_bytes().to_vec(),
            RegisterValue::Double(v) => v.to_le_bytes().to_vec(),
            RegisterValue::String(v) => v.as_bytes().to_vec(),
            RegisterValue::Blob(v) => v.clone(),
        }
    }

    /// Width in bytes: fixed for numeric types, content length otherwise
    pub fn byte_width(&self) -> usize {
        match self {
            RegisterValue::Bool(_)
            | RegisterValue::Char(_)
            | RegisterValue::SChar(_)
            | RegisterValue::UChar(_) => 1,
            RegisterValue::Short(_) | RegisterValue::UShort(_) => 2,
            RegisterValue::Int(_) | RegisterValue::UInt(_) | RegisterValue::Float(_) => 4,
            RegisterValue::Long(_) | RegisterValue::ULong(_) | RegisterValue::Double(_) => 8,
            RegisterValue::String(v) => v.len(),
            RegisterValue::Blob(v) => v.len(),
        }
    }

    /// Variable type this value is stored as
    pub fn var_type(&self) -> VariableType {
        match self {
            RegisterValue::Bool(_) => VariableType::Bool,
            RegisterValue::Char(_) => VariableType::Char,
            RegisterValue::SChar(_) => VariableType::SChar,
            RegisterValue::UChar(_) => VariableType::UChar,
            RegisterValue::Short(_) => VariableType::Short,
            RegisterValue::UShort(_) => VariableType::UShort,
            RegisterValue::Int(_) => VariableType::Int,
            RegisterValue::UInt(_) => VariableType::UInt,
            RegisterValue::Long(_) => VariableType::Long,
            RegisterValue::ULong(_) => VariableType::ULong,
            RegisterValue::Float(_) => VariableType::Float,
            RegisterValue::Double(_) => VariableType::Double,
            RegisterValue::String(_) => VariableType::String,
            RegisterValue::Blob(_) => VariableType::Blob,
        }
    }

    /// Assign a native value, rejecting mismatched types
    ///
    /// String registers accept any native value in its text form.
    pub fn from_object(var_type: VariableType, value: NativeValue) -> Result<Self, ValueError> {
        let converted = match (Self::zero(var_type), value) {
            (RegisterValue::Bool(_), NativeValue::Bool(v)) => RegisterValue::Bool(v),
            (RegisterValue::Char(_), NativeValue::U8(v)) => RegisterValue::Char(v),
            (RegisterValue::SChar(_), NativeValue::I8(v)) => RegisterValue::SChar(v),
            (RegisterValue::UChar(_), NativeValue::U8(v)) => RegisterValue::UChar(v),
            (RegisterValue::Short(_), NativeValue::I16(v)) => RegisterValue::Short(v),
            (RegisterValue::UShort(_), NativeValue::U16(v)) => RegisterValue::UShort(v),
            (RegisterValue::Int(_), NativeValue::I32(v)) => RegisterValue::Int(v),
            (RegisterValue::UInt(_), NativeValue::U32(v)) => RegisterValue::UInt(v),
            (RegisterValue::Long(_), NativeValue::I64(v)) => RegisterValue::Long(v),
            (RegisterValue::ULong(_), NativeValue::U64(v)) => RegisterValue::ULong(v),
            (RegisterValue::Float(_), NativeValue::F32(v)) => RegisterValue::Float(v),
            (RegisterValue::Double(_), NativeValue::F64(v)) => RegisterValue::Double(v),
            (RegisterValue::Blob(_), NativeValue::Bytes(v)) => RegisterValue::Blob(v),
            (RegisterValue::String(_), other) => RegisterValue::String(native_text(other)),
            (_, other) => {
                return Err(ValueError::TypeMismatch {
                    expected: var_type,
                    found: other.type_name(),
                })
            }
        };
        Ok(converted)
    }

    /// Parse user text for a `var_type` register
    ///
    /// Numeric registers accept decimal, `0x` hex and `0b` binary input in
    /// any display format; in `Hex`/`Bin` format the prefix is optional.
    /// Integer input that does not fit the register wraps around. Other
    /// registers, and numeric registers in `Dec`/`Char`/`Utf8` format, take
    /// their raw bytes from the text according to the format.
    pub fn from_string(
        var_type: VariableType,
        text: &str,
        format: ValueDisplayFormat,
    ) -> Result<Self, ValueError> {
        let parse_error = || ValueError::Parse {
            text: text.to_string(),
            target: var_type,
        };
        let template = Self::zero(var_type);

        if template.is_numeric() {
            let prefixed;
            let text = match format {
                ValueDisplayFormat::Hex if !has_prefix(text, "0x") => {
                    prefixed = format!("0x{}", text.trim());
                    prefixed.as_str()
                }
                ValueDisplayFormat::Bin if !has_prefix(text, "0b") => {
                    prefixed = format!("0b{}", text.trim());
                    prefixed.as_str()
                }
                ValueDisplayFormat::Char | ValueDisplayFormat::Utf8 => {
                    return Ok(Self::from_bytes(var_type, &format_bytes(text, format)?));
                }
                _ => text,
            };
            return parse_numeric(&template, text).map_err(|e| match e {
                NumberError::Invalid => parse_error(),
                NumberError::OutOfRange => ValueError::OutOfRange {
                    text: text.to_string(),
                    target: var_type,
                },
            });
        }

        match (template, format) {
            (RegisterValue::Bool(_), ValueDisplayFormat::Default) => {
                parse_bool(text).map(RegisterValue::Bool).ok_or_else(parse_error)
            }
            (RegisterValue::Char(_), ValueDisplayFormat::Default) => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii() => Ok(RegisterValue::Char(c as u8)),
                    _ => Err(parse_error()),
                }
            }
            (RegisterValue::String(_), ValueDisplayFormat::Default) => {
                Ok(RegisterValue::String(text.to_string()))
            }
            (RegisterValue::Blob(_), ValueDisplayFormat::Default) => {
                Ok(RegisterValue::Blob(format::hex_bytes(text)?))
            }
            (_, format) => Ok(Self::from_bytes(var_type, &format_bytes(text, format)?)),
        }
    }

    /// Render the value for display
    pub fn format(&self, format: ValueDisplayFormat) -> String {
        let bytes = self.to_bytes();
        match format {
            ValueDisplayFormat::Default => self.to_string(),
            ValueDisplayFormat::Dec => dec_string(&bytes),
            ValueDisplayFormat::Hex => hex_string(&bytes),
            ValueDisplayFormat::Bin => bin_string(&bytes),
            ValueDisplayFormat::Char => format::ascii_string(&bytes),
            ValueDisplayFormat::Utf8 => String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    /// Numeric value as `f64`, for plotting
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RegisterValue::Bool(v) => Some(*v as u8 as f64),
            RegisterValue::Char(v) | RegisterValue::UChar(v) => Some(*v as f64),
            RegisterValue::SChar(v) => Some(*v as f64),
            RegisterValue::Short(v) => Some(*v as f64),
            RegisterValue::UShort(v) => Some(*v as f64),
            RegisterValue::Int(v) => Some(*v as f64),
            RegisterValue::UInt(v) => Some(*v as f64),
            RegisterValue::Long(v) => Some(*v as f64),
            RegisterValue::ULong(v) => Some(*v as f64),
            RegisterValue::Float(v) => Some(*v as f64),
            RegisterValue::Double(v) => Some(*v),
            RegisterValue::String(_) | RegisterValue::Blob(_) => None,
        }
    }

    fn is_numeric(&self) -> bool {
        !matches!(
            self,
            RegisterValue::Bool(_)
                | RegisterValue::Char(_)
                | RegisterValue::String(_)
                | RegisterValue::Blob(_)
        )
    }
}

fn has_prefix(text: &str, prefix: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Parse into the numeric variant of `template`
fn parse_numeric(template: &RegisterValue, text: &str) -> Result<RegisterValue, NumberError> {
    let value = match template {
        RegisterValue::Float(_) => RegisterValue::Float(parse_float(text)? as f32),
        RegisterValue::Double(_) => RegisterValue::Double(parse_float(text)?),
        _ => {
            let raw = parse_integer(text).ok_or(NumberError::Invalid)?;
            match template {
                RegisterValue::SChar(_) => RegisterValue::SChar(raw as i8),
                RegisterValue::UChar(_) => RegisterValue::UChar(raw as u8),
                RegisterValue::Short(_) => RegisterValue::Short(raw as i16),
                RegisterValue::UShort(_) => RegisterValue::UShort(raw as u16),
                RegisterValue::Int(_) => RegisterValue::Int(raw as i32),
                RegisterValue::UInt(_) => RegisterValue::UInt(raw as u32),
                RegisterValue::Long(_) => RegisterValue::Long(raw as i64),
                RegisterValue::ULong(_) => RegisterValue::ULong(raw as u64),
                _ => return Err(NumberError::Invalid),
            }
        }
    };
    Ok(value)
}

/// Raw bytes from text in one of the byte-oriented display formats
fn format_bytes(text: &str, format: ValueDisplayFormat) -> Result<Vec<u8>, ValueError> {
    match format {
        ValueDisplayFormat::Hex => format::hex_bytes(text),
        ValueDisplayFormat::Bin => format::bin_bytes(text),
        ValueDisplayFormat::Dec | ValueDisplayFormat::Default => format::dec_bytes(text),
        ValueDisplayFormat::Char => Ok(format::ascii_bytes(text)),
        ValueDisplayFormat::Utf8 => Ok(text.as_bytes().to_vec()),
    }
}

fn native_text(value: NativeValue) -> String {
    match value {
        NativeValue::Bool(v) => v.to_string(),
        NativeValue::I8(v) => v.to_string(),
        NativeValue::U8(v) => v.to_string(),
        NativeValue::I16(v) => v.to_string(),
        NativeValue::U16(v) => v.to_string(),
        NativeValue::I32(v) => v.to_string(),
        NativeValue::U32(v) => v.to_string(),
        NativeValue::I64(v) => v.to_string(),
        NativeValue::U64(v) => v.to_string(),
        NativeValue::F32(v) => v.to_string(),
        NativeValue::F64(v) => v.to_string(),
        NativeValue::Str(v) => v,
        NativeValue::Bytes(v) => String::from_utf8_lossy(&v).into_owned(),
    }
}

impl fmt::Display for RegisterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterValue::Bool(v) => write!(f, "{}", v),
            RegisterValue::Char(v) => write!(f, "{}", *v as char),
            RegisterValue::SChar(v) => write!(f, "{}", v),
            RegisterValue::UChar(v) => write!(f, "{}", v),
            RegisterValue::Short(v) => write!(f, "{}", v),
            RegisterValue::UShort(v) => write!(f, "{}", v),
            RegisterValue::Int(v) => write!(f, "{}", v),
            RegisterValue::UInt(v) => write!(f, "{}", v),
            RegisterValue::Long(v) => write!(f, "{}", v),
            RegisterValue::ULong(v) => write!(f, "{}", v),
            RegisterValue::Float(v) => write!(f, "{}", v),
            RegisterValue::Double(v) => write!(f, "{}", v),
            RegisterValue::String(v) => f.write_str(v),
            RegisterValue::Blob(v) => f.write_str(&hex_string(v)),
        }
    }
}

/// A received value with the node time it was sampled at
#[derive(Debug, Clone, PartialEq)]
pub struct TimedValue {
    /// The value
    pub value: RegisterValue,
    /// Node timestamp for channel samples, `None` for one-off queries
    pub timestamp: Option<u32>,
}
