//! Transport module - worker location, pipes, and protocol sessions.
//!
//! Provides:
//! - Unix Domain Sockets (Linux/macOS) and Named Pipes (Windows)
//! - [`WorkerConnector`] implementations for running and launched workers
//! - [`Session`], the typed value channel on top of a connected stream

mod connector;
mod pipe;
mod process;
mod session;

pub use connector::{PipeConnector, WorkerConnector};
pub use pipe::{session_pipe_path, PipeListener, PipeStream};
pub use process::{
    ProcessConnector, WorkerProcess, DEFAULT_STARTUP_TIMEOUT, SESSION_ID_ENV, STAGING_DIR_ENV,
};
pub use session::{Session, SessionInfo};
