//! Locating a worker.
//!
//! Establishing the byte stream to a worker is separate from establishing a
//! protocol [`Session`](super::Session) on it, so the coordinator can be
//! driven against an in-process fake worker, an already-running worker, or
//! a freshly launched one.

use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};

use super::pipe::PipeStream;
use crate::error::{Result, SplitError};
use crate::request::SplitRequest;

/// Produces a connected byte stream to a worker for one request.
pub trait WorkerConnector: Send + Sync {
    /// Stream type handed to the session.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Connect to (or launch) a worker for `request`.
    ///
    /// # Errors
    ///
    /// Returns `TransportUnavailable` if no worker can be reached.
    fn connect(&self, request: &SplitRequest)
        -> impl Future<Output = Result<Self::Stream>> + Send;
}

/// Connects to a worker that is already listening on a local pipe.
#[derive(Debug, Clone)]
pub struct PipeConnector {
    path: String,
}

impl PipeConnector {
    /// Create a connector for the given socket or named pipe path.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Get the pipe path.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl WorkerConnector for PipeConnector {
    type Stream = PipeStream;

    async fn connect(&self, request: &SplitRequest) -> Result<PipeStream> {
        tracing::debug!(
            "Connecting session {} to worker at {}",
            request.session_id(),
            self.path
        );
        PipeStream::connect(&self.path).await.map_err(|e| {
            SplitError::TransportUnavailable(format!(
                "Cannot reach worker at {}: {}",
                self.path, e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_pipe_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.sock");
        let connector = PipeConnector::new(path.to_string_lossy());
        let request = SplitRequest::new("/data/input.csv", 1, 1, "", dir.path()).unwrap();

        let err = connector.connect(&request).await.unwrap_err();
        assert!(matches!(err, SplitError::TransportUnavailable(_)));
        assert!(err.to_string().contains("Cannot reach worker"));
    }
}
