//! Wire format encoding.
//!
//! Every value on the data plane is a one-byte type tag followed by a body:
//! ```text
//! ┌─────┬──────────────────────────────────────┐
//! │ Tag │ Body                                 │
//! ├─────┼──────────────────────────────────────┤
//! │0x07 │ i32 BE (4 bytes)                     │
//! │0x06 │ i64 BE (8 bytes)                     │
//! │0x02 │ u32 BE length + UTF-8 bytes          │
//! └─────┴──────────────────────────────────────┘
//! ```
//!
//! All multi-byte integers are Big Endian. There is no version negotiation;
//! coordinator and worker are built against the same tag table.

use bytes::{BufMut, BytesMut};

use super::value::Value;
use crate::error::{Result, SplitError};

/// Tag size in bytes.
pub const TAG_SIZE: usize = 1;

/// String length prefix size in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Default maximum string body size (64 MB).
pub const DEFAULT_MAX_VALUE_SIZE: u32 = 64 * 1024 * 1024;

/// Type tags.
pub mod tags {
    /// UTF-8 string, length-prefixed.
    pub const STRING: u8 = 0x02;
    /// 64-bit signed integer.
    pub const LONG: u8 = 0x06;
    /// 32-bit signed integer.
    pub const INTEGER: u8 = 0x07;

    /// Fixed body size for numeric tags, `None` for strings and unknown tags.
    #[inline]
    pub fn fixed_body_size(tag: u8) -> Option<usize> {
        match tag {
            INTEGER => Some(4),
            LONG => Some(8),
            _ => None,
        }
    }

    /// Check whether a tag is known.
    #[inline]
    pub fn is_known(tag: u8) -> bool {
        matches!(tag, STRING | LONG | INTEGER)
    }
}

/// Kind of value a receiver expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Integer or long.
    Numeric,
    /// String.
    Text,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueKind::Numeric => f.write_str("numeric"),
            ValueKind::Text => f.write_str("string"),
        }
    }
}

/// Encoded size of a value (tag + body).
pub fn encoded_len(value: &Value) -> usize {
    TAG_SIZE
        + match value {
            Value::Int(_) => 4,
            Value::Long(_) => 8,
            Value::Str(s) => LENGTH_PREFIX_SIZE + s.len(),
        }
}

/// Encode a value into an existing buffer.
///
/// Fails only for strings whose length does not fit the u32 prefix. The
/// receive-side size limit is not applied here.
pub fn encode_value_into(buf: &mut BytesMut, value: &Value) -> Result<()> {
    buf.reserve(encoded_len(value));
    match value {
        Value::Int(v) => {
            buf.put_u8(tags::INTEGER);
            buf.put_i32(*v);
        }
        Value::Long(v) => {
            buf.put_u8(tags::LONG);
            buf.put_i64(*v);
        }
        Value::Str(s) => {
            let len = u32::try_from(s.len()).map_err(|_| {
                SplitError::InvalidRequest(format!(
                    "String size {} does not fit the length prefix",
                    s.len()
                ))
            })?;
            buf.put_u8(tags::STRING);
            buf.put_u32(len);
            buf.put_slice(s.as_bytes());
        }
    }
    Ok(())
}

/// Encode a single value to a fresh byte vector.
///
/// # Example
///
/// ```
/// use splitwire::protocol::{encode_value, tags, Value};
///
/// let bytes = encode_value(&Value::Int(1)).unwrap();
/// assert_eq!(bytes, vec![tags::INTEGER, 0, 0, 0, 1]);
/// ```
pub fn encode_value(value: &Value) -> Result<Vec<u8>> {
    let mut buf = BytesMut::with_capacity(encoded_len(value));
    encode_value_into(&mut buf, value)?;
    Ok(buf.to_vec())
}

/// Decode a complete body for the given tag.
pub(crate) fn decode_body(tag: u8, body: &[u8]) -> Result<Value> {
    match tag {
        tags::INTEGER => {
            let raw: [u8; 4] = body
                .try_into()
                .map_err(|_| SplitError::ProtocolDecode("Integer body must be 4 bytes".into()))?;
            Ok(Value::Int(i32::from_be_bytes(raw)))
        }
        tags::LONG => {
            let raw: [u8; 8] = body
                .try_into()
                .map_err(|_| SplitError::ProtocolDecode("Long body must be 8 bytes".into()))?;
            Ok(Value::Long(i64::from_be_bytes(raw)))
        }
        tags::STRING => String::from_utf8(body.to_vec())
            .map(Value::Str)
            .map_err(|e| SplitError::ProtocolDecode(format!("String is not valid UTF-8: {}", e))),
        other => Err(SplitError::ProtocolDecode(format!(
            "Unknown type tag 0x{:02x}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_big_endian_layout() {
        let bytes = encode_value(&Value::Int(0x01020304)).unwrap();
        assert_eq!(bytes, vec![tags::INTEGER, 0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_long_big_endian_layout() {
        let bytes = encode_value(&Value::Long(-2)).unwrap();
        assert_eq!(bytes[0], tags::LONG);
        assert_eq!(&bytes[1..], &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE]);
    }

    #[test]
    fn test_string_length_prefix() {
        let bytes = encode_value(&Value::from("h1")).unwrap();
        assert_eq!(bytes, vec![tags::STRING, 0, 0, 0, 2, b'h', b'1']);
    }

    #[test]
    fn test_empty_string_has_zero_length() {
        let bytes = encode_value(&Value::from("")).unwrap();
        assert_eq!(bytes, vec![tags::STRING, 0, 0, 0, 0]);
    }

    #[test]
    fn test_encoded_len_matches_output() {
        for value in [Value::Int(7), Value::Long(7), Value::from("/data/input.csv")] {
            assert_eq!(encode_value(&value).unwrap().len(), encoded_len(&value));
        }
    }

    #[test]
    fn test_encode_appends_to_buffer() {
        let mut buf = BytesMut::new();
        encode_value_into(&mut buf, &Value::Int(1)).unwrap();
        encode_value_into(&mut buf, &Value::from("ab")).unwrap();
        assert_eq!(
            &buf[..],
            &[tags::INTEGER, 0, 0, 0, 1, tags::STRING, 0, 0, 0, 2, b'a', b'b']
        );
    }

    #[test]
    fn test_decode_body_unknown_tag() {
        let err = decode_body(0x3F, &[]).unwrap_err();
        assert!(err.to_string().contains("Unknown type tag 0x3f"));
    }

    #[test]
    fn test_decode_body_invalid_utf8() {
        let err = decode_body(tags::STRING, &[0xC3, 0x28]).unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn test_fixed_body_sizes() {
        assert_eq!(tags::fixed_body_size(tags::INTEGER), Some(4));
        assert_eq!(tags::fixed_body_size(tags::LONG), Some(8));
        assert_eq!(tags::fixed_body_size(tags::STRING), None);
        assert!(tags::is_known(tags::STRING));
        assert!(!tags::is_known(0x00));
    }
}
