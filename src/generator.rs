//! Split request coordinator.
//!
//! The [`SplitGenerator`] drives one request/response cycle per call:
//! 1. Connect to a worker and open a session
//! 2. Send minimum split count and target path
//! 3. Read the partition count N
//! 4. Read N partition records
//! 5. Close the session
//!
//! Generation is all-or-nothing: any failure discards everything read so
//! far. The session is closed on every path. There is no retry here.
//!
//! The response carries no terminator; a worker that declares N but writes a
//! different number of records will be misparsed.
//!
//! # Example
//!
//! ```ignore
//! use splitwire::{ProcessConnector, SplitGenerator, SplitSource};
//!
//! let generator = SplitGenerator::new(ProcessConnector::new("./split-worker"));
//! let source = SplitSource::new(1, "/data/input.csv", r".*\.csv", "");
//! let splits = generator.create_input_splits(&source, 4).await?;
//! ```

use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::SplitConfig;
use crate::error::{Result, SplitError};
use crate::protocol::Value;
use crate::request::SplitRequest;
use crate::source::SplitSource;
use crate::split::PartitionDescriptor;
use crate::transport::{Session, WorkerConnector};

/// Cap on capacity reserved up front from worker-declared counts.
const MAX_PREALLOCATED: usize = 1024;

/// Computes splits by delegating to an external worker.
pub struct SplitGenerator<C> {
    connector: C,
    config: SplitConfig,
}

impl<C: WorkerConnector> SplitGenerator<C> {
    /// Create a generator with default configuration.
    pub fn new(connector: C) -> Self {
        Self::with_config(connector, SplitConfig::default())
    }

    /// Create a generator with explicit configuration.
    pub fn with_config(connector: C, config: SplitConfig) -> Self {
        Self { connector, config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    /// Get the connector.
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Compute the splits of `source`, asking for at least `min_splits`.
    pub async fn create_input_splits(
        &self,
        source: &SplitSource,
        min_splits: u32,
    ) -> Result<Vec<PartitionDescriptor>> {
        let request = source.request(min_splits, &self.config)?;
        self.generate(&request).await
    }

    /// Run one request/response cycle.
    ///
    /// Returns exactly the number of descriptors the worker declared, indexed
    /// 0..N in arrival order.
    pub async fn generate(&self, request: &SplitRequest) -> Result<Vec<PartitionDescriptor>> {
        tracing::debug!(
            "Requesting splits for {} (min {}, session {})",
            request.target_path(),
            request.min_splits(),
            request.session_id()
        );

        let stream = self.connector.connect(request).await?;
        let mut session = Session::open_with_limit(
            stream,
            request.staging_dir(),
            request.worker_args(),
            request.session_id(),
            self.config.max_value_size,
        )
        .await?;

        let result = exchange(&mut session, request).await;
        session.close().await;

        match &result {
            Ok(splits) => tracing::debug!(
                "Session {} returned {} splits for {}",
                request.session_id(),
                splits.len(),
                request.target_path()
            ),
            Err(e) => tracing::warn!(
                "Split generation for {} (session {}) failed: {}",
                request.target_path(),
                request.session_id(),
                e
            ),
        }
        result
    }
}

async fn exchange<S>(
    session: &mut Session<S>,
    request: &SplitRequest,
) -> Result<Vec<PartitionDescriptor>>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    session
        .send_value(&Value::try_from(u64::from(request.min_splits()))?)
        .await?;
    session
        .send_value(&Value::from(request.target_path()))
        .await?;

    let count = receive_count(session, "partition count").await?;
    let mut splits = Vec::with_capacity(count.min(MAX_PREALLOCATED));

    for index in 0..count {
        let path = session.receive_string().await?;
        let from = receive_offset(session, "start offset").await?;
        let to = receive_offset(session, "end offset").await?;
        if to < from {
            return Err(SplitError::ProtocolDecode(format!(
                "Split {} ends at {} before it starts at {}",
                index, to, from
            )));
        }

        let host_count = receive_count(session, "host count").await?;
        let mut hosts = Vec::with_capacity(host_count.min(MAX_PREALLOCATED));
        for _ in 0..host_count {
            hosts.push(session.receive_string().await?);
        }

        splits.push(PartitionDescriptor::new(index, path, from, to, hosts));
    }

    Ok(splits)
}

async fn receive_offset<S>(session: &mut Session<S>, what: &str) -> Result<u64>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let value = session.receive_int().await?;
    u64::try_from(value)
        .map_err(|_| SplitError::ProtocolDecode(format!("Negative {}: {}", what, value)))
}

async fn receive_count<S>(session: &mut Session<S>, what: &str) -> Result<usize>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let value = session.receive_int().await?;
    usize::try_from(value)
        .map_err(|_| SplitError::ProtocolDecode(format!("Invalid {}: {}", what, value)))
}
