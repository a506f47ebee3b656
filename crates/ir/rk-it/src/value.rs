//! Literal values carried by folded expressions and constants

use crate::ty::PrimitiveKind;
use std::fmt;

/// A primitive literal value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `i8` literal
    I8(i8),
    /// `i16` literal
    I16(i16),
    /// `i32` literal
    I32(i32),
    /// `i64` literal
    I64(i64),
    /// `u8` literal
    U8(u8),
    /// `u16` literal
    U16(u16),
    /// `u32` literal
    U32(u32),
    /// `u64` literal
    U64(u64),
    /// Default integer
    Int(i64),
    /// `float` literal
    Float(f32),
    /// `double` literal
    Double(f64),
    /// `true` or `false`
    Bool(bool),
    /// `char` literal
    Char(char),
    /// `string` literal
    String(String),
    /// `null`
    Null,
}

impl Value {
    /// Primitive kind of the value; `None` for `null`
    pub fn kind(&self) -> Option<PrimitiveKind> {
        Some(match self {
            Self::I8(_) => PrimitiveKind::I8,
            Self::I16(_) => PrimitiveKind::I16,
            Self::I32(_) => PrimitiveKind::I32,
            Self::I64(_) => PrimitiveKind::I64,
            Self::U8(_) => PrimitiveKind::U8,
            Self::U16(_) => PrimitiveKind::U16,
            Self::U32(_) => PrimitiveKind::U32,
            Self::U64(_) => PrimitiveKind::U64,
            Self::Int(_) => PrimitiveKind::Int,
            Self::Float(_) => PrimitiveKind::Float,
            Self::Double(_) => PrimitiveKind::Double,
            Self::Bool(_) => PrimitiveKind::Bool,
            Self::Char(_) => PrimitiveKind::Char,
            Self::String(_) => PrimitiveKind::String,
            Self::Null => return None,
        })
    }

    /// Widened integer payload
    pub fn as_i128(&self) -> Option<i128> {
        Some(match *self {
            Self::I8(inner) => i128::from(inner),
            Self::I16(inner) => i128::from(inner),
            Self::I32(inner) => i128::from(inner),
            Self::I64(inner) | Self::Int(inner) => i128::from(inner),
            Self::U8(inner) => i128::from(inner),
            Self::U16(inner) => i128::from(inner),
            Self::U32(inner) => i128::from(inner),
            Self::U64(inner) => i128::from(inner),
            _ => return None,
        })
    }

    /// Floating point payload
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Float(inner) => Some(f64::from(inner)),
            Self::Double(inner) => Some(inner),
            _ => None,
        }
    }

    /// Boolean payload
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(inner) => Some(inner),
            _ => None,
        }
    }

    /// Build an integer value of `kind`, failing when `value` is out of range
    pub fn from_i128(kind: PrimitiveKind, value: i128) -> Option<Self> {
        Some(match kind {
            PrimitiveKind::I8 => Self::I8(i8::try_from(value).ok()?),
            PrimitiveKind::I16 => Self::I16(i16::try_from(value).ok()?),
            PrimitiveKind::I32 => Self::I32(i32::try_from(value).ok()?),
            PrimitiveKind::I64 => Self::I64(i64::try_from(value).ok()?),
            PrimitiveKind::U8 => Self::U8(u8::try_from(value).ok()?),
            PrimitiveKind::U16 => Self::U16(u16::try_from(value).ok()?),
            PrimitiveKind::U32 => Self::U32(u32::try_from(value).ok()?),
            PrimitiveKind::U64 => Self::U64(u64::try_from(value).ok()?),
            PrimitiveKind::Int => Self::Int(i64::try_from(value).ok()?),
            _ => return None,
        })
    }

    /// Build an integer value of `kind`, truncating to its width
    pub fn wrapping_from_i128(kind: PrimitiveKind, value: i128) -> Option<Self> {
        Some(match kind {
            PrimitiveKind::I8 => Self::I8(value as i8),
            PrimitiveKind::I16 => Self::I16(value as i16),
            PrimitiveKind::I32 => Self::I32(value as i32),
            PrimitiveKind::I64 => Self::I64(value as i64),
            PrimitiveKind::U8 => Self::U8(value as u8),
            PrimitiveKind::U16 => Self::U16(value as u16),
            PrimitiveKind::U32 => Self::U32(value as u32),
            PrimitiveKind::U64 => Self::U64(value as u64),
            PrimitiveKind::Int => Self::Int(value as i64),
            _ => return None,
        })
    }

    /// Zero of a numeric kind
    pub fn zero(kind: PrimitiveKind) -> Option<Self> {
        match kind {
            PrimitiveKind::Float => Some(Self::Float(0.0)),
            PrimitiveKind::Double => Some(Self::Double(0.0)),
            _ => Self::from_i128(kind, 0),
        }
    }

    /// Sign of a numeric value: -1, 0 or 1
    pub fn signum(&self) -> Option<i8> {
        if let Some(inner) = self.as_i128() {
            return Some(inner.signum() as i8);
        }
        let inner = self.as_f64()?;
        Some(if inner > 0.0 {
            1
        } else if inner < 0.0 {
            -1
        } else {
            0
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I8(inner) => write!(formatter, "{inner}"),
            Self::I16(inner) => write!(formatter, "{inner}"),
            Self::I32(inner) => write!(formatter, "{inner}"),
            Self::I64(inner) | Self::Int(inner) => write!(formatter, "{inner}"),
            Self::U8(inner) => write!(formatter, "{inner}"),
            Self::U16(inner) => write!(formatter, "{inner}"),
            Self::U32(inner) => write!(formatter, "{inner}"),
            Self::U64(inner) => write!(formatter, "{inner}"),
            Self::Float(inner) => write!(formatter, "{inner}"),
            Self::Double(inner) => write!(formatter, "{inner}"),
            Self::Bool(inner) => write!(formatter, "{inner}"),
            Self::Char(inner) => write!(formatter, "{inner:?}"),
            Self::String(inner) => write!(formatter, "{inner:?}"),
            Self::Null => write!(formatter, "null"),
        }
    }
}
