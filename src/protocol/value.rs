//! Typed values carried on the data plane.

use super::wire_format::ValueKind;
use crate::error::SplitError;

/// A single protocol value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// 32-bit integer.
    Int(i32),
    /// 64-bit integer.
    Long(i64),
    /// UTF-8 string.
    Str(String),
}

impl Value {
    /// Kind of this value.
    #[inline]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) | Value::Long(_) => ValueKind::Numeric,
            Value::Str(_) => ValueKind::Text,
        }
    }

    /// Numeric value widened to i64.
    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(i64::from(*v)),
            Value::Long(v) => Some(*v),
            Value::Str(_) => None,
        }
    }

    /// Borrow the string contents.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Take the string contents.
    pub fn into_string(self) -> Option<String> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

/// Counts and offsets use the narrow integer form when it fits.
///
/// ```
/// use splitwire::protocol::Value;
///
/// assert_eq!(Value::try_from(4u64).unwrap(), Value::Int(4));
/// assert_eq!(Value::try_from(1u64 << 40).unwrap(), Value::Long(1 << 40));
/// assert!(Value::try_from(u64::MAX).is_err());
/// ```
impl TryFrom<u64> for Value {
    type Error = SplitError;

    fn try_from(n: u64) -> Result<Self, Self::Error> {
        if let Ok(v) = i32::try_from(n) {
            return Ok(Value::Int(v));
        }
        i64::try_from(n)
            .map(Value::Long)
            .map_err(|_| SplitError::ProtocolDecode(format!("Value {} exceeds the long range", n)))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}
