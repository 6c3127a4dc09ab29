//! Value buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` to collect bytes from the worker pipe.
//! Implements a state machine for handling fragmented values:
//! - `WaitingForTag`: Need at least 1 byte
//! - `WaitingForLength`: String tag read, need the 4-byte length prefix
//! - `WaitingForBody`: Tag (and length) known, need N more body bytes
//!
//! # Example
//!
//! ```
//! use splitwire::protocol::{encode_value, Value, ValueBuffer};
//!
//! let mut buffer = ValueBuffer::new();
//! let bytes = encode_value(&Value::Int(2)).unwrap();
//!
//! // Data may arrive in arbitrary chunks from the pipe
//! assert!(buffer.push(&bytes[..3]).unwrap().is_empty());
//! let values = buffer.push(&bytes[3..]).unwrap();
//! assert_eq!(values, vec![Value::Int(2)]);
//! ```

use bytes::{Buf, BytesMut};

use super::value::Value;
use super::wire_format::{decode_body, tags, DEFAULT_MAX_VALUE_SIZE, LENGTH_PREFIX_SIZE};
use crate::error::{Result, SplitError};

/// State machine for value parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Waiting for the type tag.
    WaitingForTag,
    /// String tag consumed, waiting for the length prefix.
    WaitingForLength,
    /// Waiting for `remaining` body bytes of a value tagged `tag`.
    WaitingForBody { tag: u8, remaining: usize },
}

/// Buffer for accumulating incoming bytes and extracting complete values.
pub struct ValueBuffer {
    /// Accumulated bytes from pipe reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Maximum allowed string body size.
    max_value_size: u32,
}

impl ValueBuffer {
    /// Create a new value buffer with default settings.
    ///
    /// Default capacity: 8KB, max string: 64MB.
    pub fn new() -> Self {
        Self::with_max_value_size(DEFAULT_MAX_VALUE_SIZE)
    }

    /// Create a new value buffer with a custom max string size.
    pub fn with_max_value_size(max_value_size: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(8 * 1024),
            state: State::WaitingForTag,
            max_value_size,
        }
    }

    /// Push data into the buffer and extract all complete values.
    ///
    /// Partial data is kept for the next push.
    ///
    /// # Errors
    ///
    /// Returns error on an unknown tag, an oversized string, or invalid UTF-8.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Value>> {
        self.extend(data);

        let mut values = Vec::new();
        while let Some(value) = self.next_value()? {
            values.push(value);
        }

        Ok(values)
    }

    /// Append data to the buffer without extracting values.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to extract a single value from the buffer.
    ///
    /// Returns:
    /// - `Ok(Some(value))` if a complete value was extracted
    /// - `Ok(None)` if more data is needed
    /// - `Err(...)` on a protocol violation
    pub fn next_value(&mut self) -> Result<Option<Value>> {
        match self.state {
            State::WaitingForTag => {
                if self.buffer.is_empty() {
                    return Ok(None);
                }

                let tag = self.buffer[0];
                self.state = match tag {
                    tags::STRING => State::WaitingForLength,
                    _ => match tags::fixed_body_size(tag) {
                        Some(remaining) => State::WaitingForBody { tag, remaining },
                        None => {
                            return Err(SplitError::ProtocolDecode(format!(
                                "Unknown type tag 0x{:02x}",
                                tag
                            )))
                        }
                    },
                };
                self.buffer.advance(1);

                self.next_value()
            }

            State::WaitingForLength => {
                if self.buffer.len() < LENGTH_PREFIX_SIZE {
                    return Ok(None);
                }

                let length = self.buffer.get_u32();
                if length > self.max_value_size {
                    return Err(SplitError::ProtocolDecode(format!(
                        "String size {} exceeds maximum {}",
                        length, self.max_value_size
                    )));
                }

                self.state = State::WaitingForBody {
                    tag: tags::STRING,
                    remaining: length as usize,
                };

                self.next_value()
            }

            State::WaitingForBody { tag, remaining } => {
                if self.buffer.len() < remaining {
                    return Ok(None);
                }

                let body = self.buffer.split_to(remaining);
                self.state = State::WaitingForTag;

                decode_body(tag, &body).map(Some)
            }
        }
    }

    /// Whether a value has been started but not completed.
    pub fn has_partial(&self) -> bool {
        self.state != State::WaitingForTag || !self.buffer.is_empty()
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForTag;
    }

    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match self.state {
            State::WaitingForTag => "WaitingForTag",
            State::WaitingForLength => "WaitingForLength",
            State::WaitingForBody { .. } => "WaitingForBody",
        }
    }
}

impl Default for ValueBuffer {
    fn default() -> Self {
        Self::new()
    }
}
