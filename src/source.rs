//! Input sources that delegate splitting to a worker.

use crate::config::SplitConfig;
use crate::error::{Result, SplitError};
use crate::filter::FileFilter;
use crate::request::SplitRequest;

/// A file (or directory) whose splits are computed by an external worker.
///
/// The id doubles as the session id for every request built from this
/// source, so sources processed concurrently must have distinct ids.
#[derive(Debug, Clone)]
pub struct SplitSource {
    id: u32,
    path: String,
    filter: std::result::Result<FileFilter, regex::Error>,
    worker_args: String,
}

impl SplitSource {
    /// Create a source.
    ///
    /// A malformed `filter_pattern` is not rejected here; it surfaces from
    /// [`SplitSource::accept_file`].
    pub fn new(
        id: u32,
        path: impl Into<String>,
        filter_pattern: &str,
        worker_args: impl Into<String>,
    ) -> Self {
        Self {
            id,
            path: path.into(),
            filter: FileFilter::compile(filter_pattern),
            worker_args: worker_args.into(),
        }
    }

    /// Source id.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Source path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Opaque worker configuration payload.
    pub fn worker_args(&self) -> &str {
        &self.worker_args
    }

    /// Whether a bare file name is eligible for splitting.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPattern` if the source's pattern is malformed.
    pub fn accept_file(&self, file_name: &str) -> Result<bool> {
        match &self.filter {
            Ok(filter) => Ok(filter.matches(file_name)),
            Err(e) => Err(SplitError::InvalidPattern(e.clone())),
        }
    }

    /// Build the request for one split generation call.
    pub fn request(&self, min_splits: u32, config: &SplitConfig) -> Result<SplitRequest> {
        SplitRequest::new(
            self.path.clone(),
            min_splits,
            self.id,
            self.worker_args.clone(),
            config.staging_path(),
        )
    }
}
