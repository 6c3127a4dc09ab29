//! Split requests and session id allocation.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::{Result, SplitError};

/// One split generation request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitRequest {
    target_path: String,
    min_splits: u32,
    session_id: u32,
    worker_args: String,
    staging_dir: PathBuf,
}

impl SplitRequest {
    /// Build a request.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if `min_splits` is zero.
    pub fn new(
        target_path: impl Into<String>,
        min_splits: u32,
        session_id: u32,
        worker_args: impl Into<String>,
        staging_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        if min_splits == 0 {
            return Err(SplitError::InvalidRequest(
                "Minimum split count must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            target_path: target_path.into(),
            min_splits,
            session_id,
            worker_args: worker_args.into(),
            staging_dir: staging_dir.into(),
        })
    }

    /// File to be split.
    pub fn target_path(&self) -> &str {
        &self.target_path
    }

    /// Requested lower bound on the number of splits.
    pub fn min_splits(&self) -> u32 {
        self.min_splits
    }

    /// Session id.
    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    /// Opaque worker configuration payload.
    pub fn worker_args(&self) -> &str {
        &self.worker_args
    }

    /// Staging directory.
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }
}

/// Hands out distinct session ids for concurrent requests.
#[derive(Debug, Default)]
pub struct SessionIds {
    next: AtomicU32,
}

impl SessionIds {
    /// Start allocating at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start allocating at `first`.
    pub fn starting_at(first: u32) -> Self {
        Self {
            next: AtomicU32::new(first),
        }
    }

    /// Allocate the next id.
    pub fn next_id(&self) -> u32 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
