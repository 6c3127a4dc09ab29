//! Launching a worker process.
//!
//! The coordinator spawns the worker executable, hands it the staging
//! directory and session id through the environment, waits for the `$ready`
//! control line on the worker's stdout, then connects to the announced pipe.
//!
//! The child is killed when the returned [`WorkerProcess`] is dropped, so a
//! caller that abandons a call (for example on an external timeout) also
//! terminates the worker.

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, BufReader, ReadBuf};
use tokio::process::{Child, ChildStdout, Command};

use super::connector::WorkerConnector;
use super::pipe::PipeStream;
use crate::control::{read_control_line, WorkerReady};
use crate::error::{Result, SplitError};
use crate::request::SplitRequest;

/// Environment variable carrying the staging directory.
pub const STAGING_DIR_ENV: &str = "SPLITWIRE_STAGING_DIR";

/// Environment variable carrying the session id.
pub const SESSION_ID_ENV: &str = "SPLITWIRE_SESSION_ID";

/// Default time a worker gets to announce `$ready`.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Spawns one worker process per request.
#[derive(Debug, Clone)]
pub struct ProcessConnector {
    program: PathBuf,
    args: Vec<OsString>,
    startup_timeout: Duration,
}

impl ProcessConnector {
    /// Create a connector for the given worker executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
        }
    }

    /// Append a command-line argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several command-line arguments.
    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set how long the worker gets to announce `$ready`.
    ///
    /// Default: 30 seconds
    pub fn startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Get the worker executable path.
    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    async fn await_ready(&self, stdout: &mut BufReader<ChildStdout>) -> Result<WorkerReady> {
        let line = tokio::time::timeout(self.startup_timeout, read_control_line(stdout))
            .await
            .map_err(|_| {
                SplitError::TransportUnavailable(format!(
                    "Worker did not report ready within {:?}",
                    self.startup_timeout
                ))
            })?
            .map_err(|e| {
                SplitError::TransportUnavailable(format!("Reading worker stdout failed: {}", e))
            })?
            .ok_or_else(|| {
                SplitError::TransportUnavailable("Worker exited before reporting ready".into())
            })?;

        WorkerReady::parse(&line)
    }
}

impl WorkerConnector for ProcessConnector {
    type Stream = WorkerProcess;

    async fn connect(&self, request: &SplitRequest) -> Result<WorkerProcess> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env(STAGING_DIR_ENV, request.staging_dir())
            .env(SESSION_ID_ENV, request.session_id().to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SplitError::TransportUnavailable(format!(
                    "Failed to launch worker {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            SplitError::TransportUnavailable("Worker stdout is not captured".into())
        })?;
        let mut stdout = BufReader::new(stdout);

        let ready = self.await_ready(&mut stdout).await?;
        if ready.session != request.session_id() {
            return Err(SplitError::TransportUnavailable(format!(
                "Worker announced session {} but session {} was requested",
                ready.session,
                request.session_id()
            )));
        }

        let pipe = PipeStream::connect(&ready.pipe).await.map_err(|e| {
            SplitError::TransportUnavailable(format!(
                "Cannot reach worker at {}: {}",
                ready.pipe, e
            ))
        })?;

        tracing::debug!(
            "Worker {} (pid {:?}) ready for session {} at {}",
            self.program.display(),
            child.id(),
            ready.session,
            ready.pipe
        );

        Ok(WorkerProcess {
            pipe,
            child,
            _stdout: stdout,
        })
    }
}

/// Data plane stream to a launched worker.
///
/// Owns the child process; dropping the stream kills the worker.
pub struct WorkerProcess {
    pipe: PipeStream,
    child: Child,
    // Held open so late worker output does not hit a closed pipe.
    _stdout: BufReader<ChildStdout>,
}

impl WorkerProcess {
    /// OS process id of the worker, if it is still running.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Forcibly terminate the worker.
    pub async fn kill(&mut self) -> io::Result<()> {
        self.child.kill().await
    }
}

impl AsyncRead for WorkerProcess {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.pipe).poll_read(cx, buf)
    }
}

impl AsyncWrite for WorkerProcess {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.pipe).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.pipe).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.pipe).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_configuration() {
        let connector = ProcessConnector::new("/usr/local/bin/split-worker")
            .arg("--verbose")
            .args(["--mode", "fixed"])
            .startup_timeout(Duration::from_secs(5));

        assert_eq!(connector.program(), &PathBuf::from("/usr/local/bin/split-worker"));
        assert_eq!(connector.args, vec!["--verbose", "--mode", "fixed"]);
        assert_eq!(connector.startup_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_default_startup_timeout() {
        let connector = ProcessConnector::new("worker");
        assert_eq!(connector.startup_timeout, DEFAULT_STARTUP_TIMEOUT);
    }

    #[tokio::test]
    async fn test_missing_executable_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let connector = ProcessConnector::new(dir.path().join("no-such-worker"));
        let request = SplitRequest::new("/data/input.csv", 1, 1, "", dir.path()).unwrap();

        let err = connector.connect(&request).await.err().unwrap();
        assert!(matches!(err, SplitError::TransportUnavailable(_)));
        assert!(err.to_string().contains("Failed to launch worker"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_worker_exiting_silently_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let connector = ProcessConnector::new("/bin/sh").args(["-c", "exit 0"]);
        let request = SplitRequest::new("/data/input.csv", 1, 1, "", dir.path()).unwrap();

        let err = connector.connect(&request).await.err().unwrap();
        assert!(err.to_string().contains("exited before reporting ready"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_silent_worker_hits_startup_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let connector = ProcessConnector::new("/bin/sh")
            .args(["-c", "sleep 5"])
            .startup_timeout(Duration::from_millis(100));
        let request = SplitRequest::new("/data/input.csv", 1, 1, "", dir.path()).unwrap();

        let started = std::time::Instant::now();
        let err = connector.connect(&request).await.err().unwrap();
        assert!(matches!(err, SplitError::TransportUnavailable(_)));
        assert!(err.to_string().contains("ready within"));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_session_mismatch_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let line = crate::control::build_ready_message("/nonexistent.sock", 99);
        let connector =
            ProcessConnector::new("/bin/sh").args(["-c".to_string(), format!("echo '{}'", line)]);
        let request = SplitRequest::new("/data/input.csv", 1, 1, "", dir.path()).unwrap();

        let err = connector.connect(&request).await.err().unwrap();
        assert!(err.to_string().contains("announced session 99"));
    }
}
