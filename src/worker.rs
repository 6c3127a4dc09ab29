//! Worker-side helpers.
//!
//! A worker process launched by [`ProcessConnector`](crate::transport::ProcessConnector)
//! reads its staging directory and session id from the environment, binds
//! the session pipe, announces it on stdout with `$ready`, and answers one
//! split query:
//!
//! ```ignore
//! splitwire::worker::run(|info, query| {
//!     let len = std::fs::metadata(&query.path)?.len();
//!     Ok(vec![PartitionDescriptor::new(0, query.path, 0, len.saturating_sub(1), vec![])])
//! })
//! .await?;
//! ```
//!
//! A handler that fails gets no protocol answer: the channel is closed and
//! the coordinator sees a read failure.

use std::path::PathBuf;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::control::{build_ready_message, write_stdout_line};
use crate::error::{Result, SplitError};
use crate::protocol::Value;
use crate::split::PartitionDescriptor;
use crate::transport::{
    session_pipe_path, PipeListener, Session, SessionInfo, SESSION_ID_ENV, STAGING_DIR_ENV,
};

/// One split query as received by a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitQuery {
    /// Minimum number of splits the coordinator asked for.
    pub min_splits: u32,
    /// Target path to split.
    pub path: String,
}

/// Read the split query that follows the establishment payload.
pub async fn read_query<S>(session: &mut Session<S>) -> Result<SplitQuery>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let min_splits = session.receive_int().await?;
    let min_splits = u32::try_from(min_splits).map_err(|_| {
        SplitError::ProtocolDecode(format!("Minimum split count out of range: {}", min_splits))
    })?;
    let path = session.receive_string().await?;
    Ok(SplitQuery { min_splits, path })
}

/// Write the response: the count, then one record per descriptor.
///
/// Descriptor indices are not sent; the coordinator assigns them by
/// arrival order.
pub async fn write_splits<S>(session: &mut Session<S>, splits: &[PartitionDescriptor]) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    session
        .send_value(&Value::try_from(splits.len() as u64)?)
        .await?;

    for split in splits {
        session.send_value(&Value::from(split.path())).await?;
        session.send_value(&Value::try_from(split.from())?).await?;
        session.send_value(&Value::try_from(split.to())?).await?;
        session
            .send_value(&Value::try_from(split.hosts().len() as u64)?)
            .await?;
        for host in split.hosts() {
            session.send_value(&Value::from(host.as_str())).await?;
        }
    }
    Ok(())
}

/// Serve one coordinator connection end to end.
///
/// Accepts the session, reads the query, runs `handler`, and writes its
/// splits. Returns the establishment payload that was received.
pub async fn serve_connection<S, F>(stream: S, handler: F) -> Result<SessionInfo>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
    F: FnOnce(&SessionInfo, SplitQuery) -> Result<Vec<PartitionDescriptor>>,
{
    let (mut session, info) = Session::accept(stream).await?;

    let result = match read_query(&mut session).await {
        Ok(query) => {
            tracing::debug!(
                "Session {}: splitting {} (min {})",
                info.session_id,
                query.path,
                query.min_splits
            );
            match handler(&info, query) {
                Ok(splits) => write_splits(&mut session, &splits).await,
                Err(e) => {
                    tracing::error!("Session {}: handler failed: {}", info.session_id, e);
                    Err(e)
                }
            }
        }
        Err(e) => Err(e),
    };

    session.close().await;
    result.map(|()| info)
}

/// Launch parameters a worker reads from its environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerEnv {
    /// Staging directory where the session pipe is bound.
    pub staging_dir: PathBuf,
    /// Session id the coordinator expects in `$ready`.
    pub session_id: u32,
}

impl WorkerEnv {
    /// Read `SPLITWIRE_STAGING_DIR` and `SPLITWIRE_SESSION_ID`.
    pub fn from_env() -> Result<Self> {
        let staging_dir = std::env::var_os(STAGING_DIR_ENV).ok_or_else(|| {
            SplitError::InvalidRequest(format!("{} is not set", STAGING_DIR_ENV))
        })?;
        let session_id = std::env::var(SESSION_ID_ENV)
            .map_err(|_| SplitError::InvalidRequest(format!("{} is not set", SESSION_ID_ENV)))?;
        Self::parse(staging_dir.into(), &session_id)
    }

    fn parse(staging_dir: PathBuf, session_id: &str) -> Result<Self> {
        let session_id = session_id.trim().parse::<u32>().map_err(|e| {
            SplitError::InvalidRequest(format!(
                "{} is not a session id ({}): {}",
                SESSION_ID_ENV, session_id, e
            ))
        })?;
        Ok(Self {
            staging_dir,
            session_id,
        })
    }

    /// Pipe path this worker binds.
    pub fn pipe_path(&self) -> String {
        session_pipe_path(&self.staging_dir, self.session_id)
    }
}

/// Run a single-session worker.
///
/// Binds the session pipe, writes `$ready` to stdout, accepts one
/// connection and serves it with `handler`.
pub async fn run<F>(handler: F) -> Result<SessionInfo>
where
    F: FnOnce(&SessionInfo, SplitQuery) -> Result<Vec<PartitionDescriptor>>,
{
    let env = WorkerEnv::from_env()?;
    tokio::fs::create_dir_all(&env.staging_dir).await?;

    let path = env.pipe_path();
    let listener = PipeListener::bind(&path).await?;
    write_stdout_line(&build_ready_message(&path, env.session_id))?;
    tracing::debug!("Worker ready on {} (session {})", path, env.session_id);

    let stream = listener.accept().await?;
    let info = serve_connection(stream, handler).await?;
    if info.session_id != env.session_id {
        tracing::warn!(
            "Session id {} in establishment payload differs from launch id {}",
            info.session_id,
            env.session_id
        );
    }
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_serve_connection_answers_query() {
        let (client, server) = duplex(4096);

        let worker = tokio::spawn(async move {
            serve_connection(server, |info, query| {
                assert_eq!(info.worker_args, "--block 1024");
                assert_eq!(query.min_splits, 2);
                Ok(vec![PartitionDescriptor::new(
                    0,
                    query.path,
                    0,
                    99,
                    vec!["h1".to_string(), "h2".to_string()],
                )])
            })
            .await
        });

        let mut session = Session::open(client, Path::new("/s"), "--block 1024", 3)
            .await
            .unwrap();
        session.send_value(&Value::Int(2)).await.unwrap();
        session.send_value(&Value::from("/data/a")).await.unwrap();

        assert_eq!(session.receive_int().await.unwrap(), 1);
        assert_eq!(session.receive_string().await.unwrap(), "/data/a");
        assert_eq!(session.receive_int().await.unwrap(), 0);
        assert_eq!(session.receive_int().await.unwrap(), 99);
        assert_eq!(session.receive_int().await.unwrap(), 2);
        assert_eq!(session.receive_string().await.unwrap(), "h1");
        assert_eq!(session.receive_string().await.unwrap(), "h2");

        let info = worker.await.unwrap().unwrap();
        assert_eq!(info.session_id, 3);
    }

    #[tokio::test]
    async fn test_handler_failure_closes_without_answer() {
        let (client, server) = duplex(4096);

        let worker = tokio::spawn(async move {
            serve_connection(server, |_, query| {
                Err(SplitError::InvalidRequest(format!("no such file: {}", query.path)))
            })
            .await
        });

        let mut session = Session::open(client, Path::new("/s"), "", 1).await.unwrap();
        session.send_value(&Value::Int(1)).await.unwrap();
        session.send_value(&Value::from("/missing")).await.unwrap();

        let err = session.receive_int().await.unwrap_err();
        assert!(matches!(err, SplitError::TransportRead(_)));
        assert!(worker.await.unwrap().is_err());
    }

    #[test]
    fn test_worker_env_parse() {
        let env = WorkerEnv::parse(PathBuf::from("/tmp/stage"), "12").unwrap();
        assert_eq!(env.session_id, 12);
        assert_eq!(env.pipe_path(), session_pipe_path(Path::new("/tmp/stage"), 12));

        let err = WorkerEnv::parse(PathBuf::from("/tmp/stage"), "twelve").unwrap_err();
        assert!(matches!(err, SplitError::InvalidRequest(_)));
    }
}
