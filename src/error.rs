//! Error types for splitwire.

use thiserror::Error;

/// Main error type for split generation.
#[derive(Debug, Error)]
pub enum SplitError {
    /// The worker could not be reached or did not acknowledge startup.
    #[error("Worker unavailable: {0}")]
    TransportUnavailable(String),

    /// The channel broke while sending a value.
    #[error("Write to worker failed: {0}")]
    TransportWrite(#[source] std::io::Error),

    /// The channel broke (or closed) while receiving a value.
    #[error("Read from worker failed: {0}")]
    TransportRead(#[source] std::io::Error),

    /// Received data did not match the expected value kind or shape.
    #[error("Protocol decode error: {0}")]
    ProtocolDecode(String),

    /// Operation attempted on a session that was closed or destroyed.
    #[error("Session closed")]
    SessionClosed,

    /// Malformed file name pattern.
    #[error("Invalid file name pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Request parameters rejected before contacting the worker.
    #[error("Invalid split request: {0}")]
    InvalidRequest(String),

    /// I/O error outside an open session (socket setup, stdio).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error on the control plane.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SplitError {
    /// Whether the error came from the worker channel rather than caller input.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SplitError::TransportUnavailable(_)
                | SplitError::TransportWrite(_)
                | SplitError::TransportRead(_)
                | SplitError::ProtocolDecode(_)
                | SplitError::SessionClosed
        )
    }
}

/// Callers that only deal in I/O failures get one error category.
impl From<SplitError> for std::io::Error {
    fn from(err: SplitError) -> Self {
        use std::io::ErrorKind;

        let kind = match &err {
            SplitError::TransportUnavailable(_) => ErrorKind::ConnectionRefused,
            SplitError::TransportWrite(e) | SplitError::TransportRead(e) | SplitError::Io(e) => {
                e.kind()
            }
            SplitError::ProtocolDecode(_) | SplitError::Json(_) => ErrorKind::InvalidData,
            SplitError::SessionClosed => ErrorKind::NotConnected,
            SplitError::InvalidPattern(_) | SplitError::InvalidRequest(_) => {
                ErrorKind::InvalidInput
            }
        };
        std::io::Error::new(kind, err)
    }
}

/// Result type alias using SplitError.
pub type Result<T> = std::result::Result<T, SplitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(SplitError::TransportUnavailable("gone".into()).is_transport());
        assert!(SplitError::ProtocolDecode("bad tag".into()).is_transport());
        assert!(SplitError::SessionClosed.is_transport());
        assert!(!SplitError::InvalidRequest("min".into()).is_transport());
    }

    #[test]
    fn test_into_io_error_keeps_kind() {
        let read = SplitError::TransportRead(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "closed",
        ));
        let io: std::io::Error = read.into();
        assert_eq!(io.kind(), std::io::ErrorKind::UnexpectedEof);

        let decode: std::io::Error = SplitError::ProtocolDecode("tag".into()).into();
        assert_eq!(decode.kind(), std::io::ErrorKind::InvalidData);
        assert!(decode.to_string().contains("Protocol decode error"));
    }
}
