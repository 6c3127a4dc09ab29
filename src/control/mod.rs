//! Control plane module - `$ready` message and stdio I/O.
//!
//! The control plane uses JSON over stdio only for the startup handshake.
//! After it, all communication happens on the data plane (pipe).
//!
//! # Workflow
//!
//! 1. Coordinator launches the worker with staging dir and session id
//! 2. Worker binds a pipe listener
//! 3. Worker sends `$ready` via stdout
//! 4. Coordinator connects to the pipe
//! 5. Binary values flow on the data plane

mod ready;
mod stdio;

pub use ready::{build_ready_message, WorkerReady, JSONRPC_VERSION, READY_METHOD};
pub use stdio::{read_control_line, write_stdout_line};
