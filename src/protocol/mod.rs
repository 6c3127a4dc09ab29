//! Protocol module - value tags, encoding, and incremental decoding.
//!
//! This module implements the binary protocol for the data plane:
//! - Tagged value encoding (integer, long, string)
//! - Value buffer for accumulating partial reads

mod value;
mod value_buffer;
mod wire_format;

pub use value::Value;
pub use value_buffer::ValueBuffer;
pub use wire_format::{
    encode_value, encode_value_into, encoded_len, tags, ValueKind, DEFAULT_MAX_VALUE_SIZE,
    LENGTH_PREFIX_SIZE, TAG_SIZE,
};
