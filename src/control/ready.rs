//! `$ready` message.
//!
//! A launched worker writes one `$ready` line on stdout to tell the coordinator:
//! - The pipe path for the data plane connection
//! - The session id it was started for
//!
//! # Example
//!
//! ```
//! use splitwire::control::{build_ready_message, WorkerReady};
//!
//! let line = build_ready_message("/tmp/splitwire/splitwire-7.sock", 7);
//! let ready = WorkerReady::parse(&line).unwrap();
//! assert_eq!(ready.session, 7);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{Result, SplitError};

/// Control plane method name.
pub const READY_METHOD: &str = "$ready";

/// JSON-RPC version string carried by control messages.
pub const JSONRPC_VERSION: &str = "2.0";

/// Parameters of the `$ready` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReady {
    /// Path to the Unix socket or named pipe for the data plane.
    pub pipe: String,
    /// Session id the worker was launched for.
    pub session: u32,
}

#[derive(Debug, Deserialize)]
struct ControlMessage {
    jsonrpc: String,
    method: String,
    params: serde_json::Value,
}

impl WorkerReady {
    /// Parse a `$ready` control line.
    ///
    /// # Errors
    ///
    /// Returns `TransportUnavailable` if the line is not a well-formed `$ready`.
    pub fn parse(line: &str) -> Result<Self> {
        let message: ControlMessage = serde_json::from_str(line.trim_end()).map_err(|e| {
            SplitError::TransportUnavailable(format!("Malformed control line from worker: {}", e))
        })?;

        if message.jsonrpc != JSONRPC_VERSION || message.method != READY_METHOD {
            return Err(SplitError::TransportUnavailable(format!(
                "Expected {} from worker, got {}",
                READY_METHOD, message.method
            )));
        }

        serde_json::from_value(message.params).map_err(|e| {
            SplitError::TransportUnavailable(format!("Malformed {} params: {}", READY_METHOD, e))
        })
    }
}

/// Build the `$ready` JSON-RPC message.
///
/// Returns a single-line JSON string to be written to stdout.
pub fn build_ready_message(pipe_path: &str, session_id: u32) -> String {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "method": READY_METHOD,
        "params": {
            "pipe": pipe_path,
            "session": session_id
        }
    })
    .to_string()
}
