//! Platform-specific pipe/socket implementation.
//!
//! - Unix: Unix Domain Socket
//! - Windows: Named Pipe
//!
//! Workers bind a [`PipeListener`]; the coordinator connects with
//! [`PipeStream::connect`].
//!
//! # Example
//!
//! ```ignore
//! use splitwire::transport::{session_pipe_path, PipeListener, PipeStream};
//!
//! let path = session_pipe_path(std::path::Path::new("/tmp/splitwire"), 7);
//! let listener = PipeListener::bind(&path).await?;
//! let stream = listener.accept().await?;
//! ```

use std::path::Path;

use crate::error::Result;

/// Pipe path for one session inside a staging directory.
///
/// Format:
/// - Unix: `{staging}/splitwire-{session}.sock`
/// - Windows: `\\.\pipe\splitwire-{pid}-{session}`
///
/// Distinct session ids never share a path within the same staging directory.
pub fn session_pipe_path(staging_dir: &Path, session_id: u32) -> String {
    #[cfg(unix)]
    {
        staging_dir
            .join(format!("splitwire-{}.sock", session_id))
            .to_string_lossy()
            .into_owned()
    }

    #[cfg(windows)]
    {
        let _ = staging_dir;
        format!(r"\\.\pipe\splitwire-{}-{}", std::process::id(), session_id)
    }
}

// ============================================================================
// Unix Implementation
// ============================================================================

#[cfg(unix)]
mod unix_impl {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
    use tokio::net::{UnixListener, UnixStream};

    /// Unix Domain Socket listener.
    #[derive(Debug)]
    pub struct PipeListener {
        listener: UnixListener,
        path: String,
    }

    /// Unix Domain Socket stream (connected).
    #[derive(Debug)]
    pub struct PipeStream {
        stream: UnixStream,
    }

    impl PipeListener {
        /// Bind to a Unix socket path.
        ///
        /// Removes any existing socket file at the path before binding.
        pub async fn bind(path: &str) -> Result<Self> {
            if Path::new(path).exists() {
                std::fs::remove_file(path)?;
            }

            let listener = UnixListener::bind(path)?;

            Ok(Self {
                listener,
                path: path.to_string(),
            })
        }

        /// Accept a single connection.
        pub async fn accept(&self) -> Result<PipeStream> {
            let (stream, _addr) = self.listener.accept().await?;
            Ok(PipeStream { stream })
        }

        /// Get the socket path.
        pub fn path(&self) -> &str {
            &self.path
        }
    }

    impl Drop for PipeListener {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    impl PipeStream {
        /// Connect to a worker listening on `path`.
        pub async fn connect(path: &str) -> io::Result<Self> {
            let stream = UnixStream::connect(path).await?;
            Ok(Self { stream })
        }
    }

    impl AsyncRead for PipeStream {
        fn poll_read(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Pin::new(&mut self.stream).poll_read(cx, buf)
        }
    }

    impl AsyncWrite for PipeStream {
        fn poll_write(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Pin::new(&mut self.stream).poll_write(cx, buf)
        }

        fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Pin::new(&mut self.stream).poll_flush(cx)
        }

        fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Pin::new(&mut self.stream).poll_shutdown(cx)
        }
    }
}

// ============================================================================
// Windows Implementation
// ============================================================================

#[cfg(windows)]
mod windows_impl {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
    use tokio::net::windows::named_pipe::{
        ClientOptions, NamedPipeClient, NamedPipeServer, ServerOptions,
    };

    /// Windows Named Pipe listener.
    #[derive(Debug)]
    pub struct PipeListener {
        path: String,
    }

    /// Windows Named Pipe stream, either end.
    #[derive(Debug)]
    pub enum PipeStream {
        /// Worker side.
        Server(NamedPipeServer),
        /// Coordinator side.
        Client(NamedPipeClient),
    }

    impl PipeListener {
        /// Create a Named Pipe server.
        pub async fn bind(path: &str) -> Result<Self> {
            ServerOptions::new().first_pipe_instance(true).create(path)?;

            Ok(Self {
                path: path.to_string(),
            })
        }

        /// Accept a single connection.
        pub async fn accept(&self) -> Result<PipeStream> {
            let server = ServerOptions::new()
                .first_pipe_instance(false)
                .create(&self.path)?;

            server.connect().await?;

            Ok(PipeStream::Server(server))
        }

        /// Get the pipe path.
        pub fn path(&self) -> &str {
            &self.path
        }
    }

    impl PipeStream {
        /// Connect to a worker listening on `path`.
        pub async fn connect(path: &str) -> io::Result<Self> {
            Ok(PipeStream::Client(ClientOptions::new().open(path)?))
        }
    }

    impl AsyncRead for PipeStream {
        fn poll_read(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            match self.get_mut() {
                PipeStream::Server(pipe) => Pin::new(pipe).poll_read(cx, buf),
                PipeStream::Client(pipe) => Pin::new(pipe).poll_read(cx, buf),
            }
        }
    }

    impl AsyncWrite for PipeStream {
        fn poll_write(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            match self.get_mut() {
                PipeStream::Server(pipe) => Pin::new(pipe).poll_write(cx, buf),
                PipeStream::Client(pipe) => Pin::new(pipe).poll_write(cx, buf),
            }
        }

        fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            match self.get_mut() {
                PipeStream::Server(pipe) => Pin::new(pipe).poll_flush(cx),
                PipeStream::Client(pipe) => Pin::new(pipe).poll_flush(cx),
            }
        }

        fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            match self.get_mut() {
                PipeStream::Server(pipe) => Pin::new(pipe).poll_shutdown(cx),
                PipeStream::Client(pipe) => Pin::new(pipe).poll_shutdown(cx),
            }
        }
    }
}

// ============================================================================
// Platform-independent re-exports
// ============================================================================

#[cfg(unix)]
pub use unix_impl::{PipeListener, PipeStream};

#[cfg(windows)]
pub use windows_impl::{PipeListener, PipeStream};
