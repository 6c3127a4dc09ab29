//! Protocol session over one worker stream.
//!
//! A [`Session`] owns the byte stream to exactly one worker instance and
//! moves typed values over it in strict order. One direction is in flight at
//! a time: every send is flushed before the next receive.
//!
//! Lifecycle:
//! - created by [`Session::open`] (coordinator) or [`Session::accept`] (worker)
//! - destroyed by [`Session::close`] or by the first send/receive failure
//!
//! A destroyed session rejects further operations with `SessionClosed`.

use std::path::Path;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, SplitError};
use crate::protocol::{encode_value_into, Value, ValueBuffer, ValueKind, DEFAULT_MAX_VALUE_SIZE};

/// Read chunk size for pipe reads.
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Establishment payload received by a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Staging directory where prestaged inputs live.
    pub staging_dir: String,
    /// Opaque worker configuration payload.
    pub worker_args: String,
    /// Session id.
    pub session_id: u32,
}

/// A typed, ordered channel to one worker.
pub struct Session<S> {
    stream: Option<S>,
    inbound: ValueBuffer,
    outbound: BytesMut,
    read_buf: Vec<u8>,
    session_id: u32,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn new(stream: S, session_id: u32, max_value_size: u32) -> Self {
        Self {
            stream: Some(stream),
            inbound: ValueBuffer::with_max_value_size(max_value_size),
            outbound: BytesMut::with_capacity(256),
            read_buf: vec![0u8; READ_CHUNK_SIZE],
            session_id,
        }
    }

    /// Open a session and send the establishment payload.
    ///
    /// Sends staging path, worker args and session id before any protocol value.
    ///
    /// # Errors
    ///
    /// Returns `TransportUnavailable` if the payload cannot be delivered.
    pub async fn open(
        stream: S,
        staging_dir: &Path,
        worker_args: &str,
        session_id: u32,
    ) -> Result<Self> {
        Self::open_with_limit(stream, staging_dir, worker_args, session_id, DEFAULT_MAX_VALUE_SIZE)
            .await
    }

    /// Same as [`Session::open`] with a custom max size for received strings.
    pub async fn open_with_limit(
        stream: S,
        staging_dir: &Path,
        worker_args: &str,
        session_id: u32,
        max_value_size: u32,
    ) -> Result<Self> {
        let mut session = Self::new(stream, session_id, max_value_size);

        let establishment = [
            Value::from(staging_dir.to_string_lossy().into_owned()),
            Value::from(worker_args),
            Value::try_from(u64::from(session_id))?,
        ];
        for value in &establishment {
            session.send_value(value).await.map_err(|e| match e {
                SplitError::TransportWrite(_) => SplitError::TransportUnavailable(format!(
                    "Session {} establishment failed: {}",
                    session_id, e
                )),
                other => other,
            })?;
        }

        tracing::debug!("Session {} opened", session_id);
        Ok(session)
    }

    /// Accept a session on the worker side by reading the establishment payload.
    pub async fn accept(stream: S) -> Result<(Self, SessionInfo)> {
        Self::accept_with_limit(stream, DEFAULT_MAX_VALUE_SIZE).await
    }

    /// Same as [`Session::accept`] with a custom max string size.
    pub async fn accept_with_limit(stream: S, max_value_size: u32) -> Result<(Self, SessionInfo)> {
        let mut session = Self::new(stream, 0, max_value_size);

        let staging_dir = session.receive_string().await?;
        let worker_args = session.receive_string().await?;
        let session_id = u32::try_from(session.receive_int().await?).map_err(|_| {
            SplitError::ProtocolDecode("Session id out of range".to_string())
        })?;
        session.session_id = session_id;

        tracing::debug!("Session {} accepted", session_id);
        Ok((
            session,
            SessionInfo {
                staging_dir,
                worker_args,
                session_id,
            },
        ))
    }

    /// Session id this session was opened with.
    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    /// Whether the underlying stream is still held.
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Send one value and flush.
    ///
    /// # Errors
    ///
    /// - `TransportWrite` if the write fails; the session is destroyed
    /// - `InvalidRequest` if a string is too long to encode; nothing is sent
    pub async fn send_value(&mut self, value: &Value) -> Result<()> {
        if self.stream.is_none() {
            return Err(SplitError::SessionClosed);
        }
        self.outbound.clear();
        encode_value_into(&mut self.outbound, value)?;

        let stream = self.stream.as_mut().ok_or(SplitError::SessionClosed)?;
        let written = match stream.write_all(&self.outbound).await {
            Ok(()) => stream.flush().await,
            Err(e) => Err(e),
        };

        if let Err(e) = written {
            tracing::debug!("Session {} write failed: {}", self.session_id, e);
            self.destroy();
            return Err(SplitError::TransportWrite(e));
        }
        Ok(())
    }

    /// Receive one value of the expected kind.
    ///
    /// # Errors
    ///
    /// - `TransportRead` if the channel fails or closes before a full value
    /// - `ProtocolDecode` if the value is malformed or of the wrong kind
    ///
    /// Either way the session is destroyed.
    pub async fn receive_value(&mut self, kind: ValueKind) -> Result<Value> {
        let value = self.next_value().await?;
        if value.kind() != kind {
            self.destroy();
            return Err(SplitError::ProtocolDecode(format!(
                "Expected {} value, received {}",
                kind,
                value.kind()
            )));
        }
        Ok(value)
    }

    /// Receive a numeric value widened to i64.
    pub async fn receive_int(&mut self) -> Result<i64> {
        let value = self.receive_value(ValueKind::Numeric).await?;
        value
            .as_i64()
            .ok_or_else(|| SplitError::ProtocolDecode("Expected numeric value".to_string()))
    }

    /// Receive a string value.
    pub async fn receive_string(&mut self) -> Result<String> {
        let value = self.receive_value(ValueKind::Text).await?;
        value
            .into_string()
            .ok_or_else(|| SplitError::ProtocolDecode("Expected string value".to_string()))
    }

    async fn next_value(&mut self) -> Result<Value> {
        if self.stream.is_none() {
            return Err(SplitError::SessionClosed);
        }
        loop {
            match self.inbound.next_value() {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => {}
                Err(e) => {
                    self.destroy();
                    return Err(e);
                }
            }

            let stream = self.stream.as_mut().ok_or(SplitError::SessionClosed)?;
            let n = match stream.read(&mut self.read_buf).await {
                Ok(0) => {
                    let detail = if self.inbound.has_partial() {
                        "worker closed the channel mid-value"
                    } else {
                        "worker closed the channel"
                    };
                    self.destroy();
                    return Err(SplitError::TransportRead(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        detail,
                    )));
                }
                Ok(n) => n,
                Err(e) => {
                    self.destroy();
                    return Err(SplitError::TransportRead(e));
                }
            };

            self.inbound.extend(&self.read_buf[..n]);
        }
    }

    /// Drop the stream and anything buffered after an unrecoverable error.
    fn destroy(&mut self) {
        self.stream = None;
        self.inbound.clear();
    }

    /// Release the channel.
    ///
    /// Idempotent and infallible: shutdown errors from a peer that already
    /// terminated are logged and dropped.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                tracing::debug!("Session {} shutdown error ignored: {}", self.session_id, e);
            }
            tracing::debug!("Session {} closed", self.session_id);
        }
        self.inbound.clear();
    }

    /// Take the raw stream, bypassing the value codec.
    #[cfg(test)]
    pub(crate) fn into_stream(mut self) -> Option<S> {
        self.stream.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encode_value;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_open_sends_establishment_payload() {
        let (client, server) = duplex(4096);

        let opener = tokio::spawn(async move {
            Session::open(client, Path::new("/tmp/splitwire"), "--mode fast", 9)
                .await
                .unwrap()
        });

        let (_worker, info) = Session::accept(server).await.unwrap();
        let coordinator = opener.await.unwrap();

        assert_eq!(info.staging_dir, "/tmp/splitwire");
        assert_eq!(info.worker_args, "--mode fast");
        assert_eq!(info.session_id, 9);
        assert_eq!(coordinator.session_id(), 9);
        assert!(coordinator.is_open());
    }

    #[tokio::test]
    async fn test_values_flow_in_order() {
        let (client, server) = duplex(4096);
        let (mut worker, mut coordinator) = tokio::join!(
            async { Session::accept(server).await.unwrap().0 },
            async {
                Session::open(client, Path::new("/s"), "", 1)
                    .await
                    .unwrap()
            }
        );

        coordinator.send_value(&Value::Int(4)).await.unwrap();
        coordinator.send_value(&Value::from("/data/input.csv")).await.unwrap();

        assert_eq!(worker.receive_int().await.unwrap(), 4);
        assert_eq!(worker.receive_string().await.unwrap(), "/data/input.csv");

        worker.send_value(&Value::Long(1 << 33)).await.unwrap();
        assert_eq!(coordinator.receive_int().await.unwrap(), 1 << 33);
    }

    #[tokio::test]
    async fn test_wrong_kind_is_decode_error_and_destroys_session() {
        let (client, mut server) = duplex(4096);
        let mut session = Session::new(client, 1, DEFAULT_MAX_VALUE_SIZE);

        let mut bytes = encode_value(&Value::from("not a number")).unwrap();
        bytes.extend(encode_value(&Value::Int(5)).unwrap());
        server.write_all(&bytes).await.unwrap();

        let err = session.receive_int().await.unwrap_err();
        assert!(matches!(err, SplitError::ProtocolDecode(_)));
        assert!(err.to_string().contains("Expected numeric value, received string"));
        assert!(!session.is_open());

        // The buffered integer must not be served by a destroyed session
        let again = session.receive_int().await.unwrap_err();
        assert!(matches!(again, SplitError::SessionClosed));
    }

    #[tokio::test]
    async fn test_unknown_tag_destroys_session() {
        let (client, mut server) = duplex(4096);
        let mut session = Session::new(client, 1, DEFAULT_MAX_VALUE_SIZE);

        server.write_all(&[0x3F, 0, 0, 0, 1]).await.unwrap();

        let err = session.receive_int().await.unwrap_err();
        assert!(err.to_string().contains("Unknown type tag 0x3f"));
        assert!(matches!(
            session.receive_int().await,
            Err(SplitError::SessionClosed)
        ));
        assert!(matches!(
            session.send_value(&Value::Int(1)).await,
            Err(SplitError::SessionClosed)
        ));
    }

    #[tokio::test]
    async fn test_receive_limit_does_not_apply_to_sends() {
        let (client, server) = duplex(4096);
        let args = "--a-serialized-argument-blob";

        let opener = tokio::spawn(async move {
            Session::open_with_limit(client, Path::new("/s"), args, 1, 16).await
        });

        let (_worker, info) = Session::accept(server).await.unwrap();
        let coordinator = opener.await.unwrap().unwrap();

        assert_eq!(info.worker_args, args);
        assert!(coordinator.is_open());
    }

    #[tokio::test]
    async fn test_receive_limit_applies_to_inbound_strings() {
        let (client, mut server) = duplex(4096);
        let mut session = Session::new(client, 1, 4);

        server
            .write_all(&encode_value(&Value::from("too long")).unwrap())
            .await
            .unwrap();

        let err = session.receive_string().await.unwrap_err();
        assert!(matches!(err, SplitError::ProtocolDecode(_)));
        assert!(err.to_string().contains("exceeds maximum"));
        assert!(!session.is_open());
    }

    #[tokio::test]
    async fn test_eof_mid_value_is_read_error() {
        let (client, mut server) = duplex(4096);
        let mut session = Session::new(client, 1, DEFAULT_MAX_VALUE_SIZE);

        let bytes = encode_value(&Value::from("truncated")).unwrap();
        server.write_all(&bytes[..6]).await.unwrap();
        drop(server);

        let err = session.receive_string().await.unwrap_err();
        match err {
            SplitError::TransportRead(e) => {
                assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof);
                assert!(e.to_string().contains("mid-value"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_after_peer_gone_is_write_error() {
        let (client, server) = duplex(16);
        drop(server);
        let mut session = Session::new(client, 1, DEFAULT_MAX_VALUE_SIZE);

        let err = session.send_value(&Value::Int(1)).await.unwrap_err();
        assert!(matches!(err, SplitError::TransportWrite(_)));
        assert!(!session.is_open());
    }

    #[tokio::test]
    async fn test_open_against_dead_peer_is_unavailable() {
        let (client, server) = duplex(16);
        drop(server);

        let result = Session::open(client, Path::new("/s"), "", 1).await;
        assert!(matches!(result, Err(SplitError::TransportUnavailable(_))));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (client, server) = duplex(16);
        let mut session = Session::new(client, 1, DEFAULT_MAX_VALUE_SIZE);
        drop(server);

        session.close().await;
        session.close().await;
        assert!(!session.is_open());
        assert!(matches!(
            session.send_value(&Value::Int(1)).await,
            Err(SplitError::SessionClosed)
        ));
    }
}
