//! Coordinator configuration.
//!
//! The staging path handed to every worker is `<temp_dir>/<channel_id>`.
//! Build one [`SplitConfig`] per process (for example with
//! [`SplitConfig::from_env`]) and pass it explicitly; nothing here is global.

use std::path::PathBuf;

use crate::protocol::DEFAULT_MAX_VALUE_SIZE;

/// Distribution channel identifier appended to the temp directory.
pub const DEFAULT_CHANNEL_ID: &str = "splitwire";

/// Environment variable overriding the temp directory.
pub const TEMP_DIR_ENV: &str = "SPLITWIRE_TMPDIR";

/// Configuration shared by all split requests of a coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitConfig {
    /// Process-wide temporary directory.
    pub temp_dir: PathBuf,
    /// Channel identifier naming the staging directory under `temp_dir`.
    pub channel_id: String,
    /// Maximum string size accepted from the worker.
    pub max_value_size: u32,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir(),
            channel_id: DEFAULT_CHANNEL_ID.to_string(),
            max_value_size: DEFAULT_MAX_VALUE_SIZE,
        }
    }
}

impl SplitConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the temp directory from `SPLITWIRE_TMPDIR`, falling back to the OS default.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(dir) = std::env::var_os(TEMP_DIR_ENV).filter(|d| !d.is_empty()) {
            config.temp_dir = PathBuf::from(dir);
        }
        config
    }

    /// Set the temp directory.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    /// Set the channel identifier.
    pub fn with_channel_id(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = channel_id.into();
        self
    }

    /// Set the maximum string size accepted from the worker.
    ///
    /// Default: 64 MB
    pub fn with_max_value_size(mut self, limit: u32) -> Self {
        self.max_value_size = limit;
        self
    }

    /// Staging directory passed to workers.
    pub fn staging_path(&self) -> PathBuf {
        self.temp_dir.join(&self.channel_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SplitConfig::new();
        assert_eq!(config.temp_dir, std::env::temp_dir());
        assert_eq!(config.channel_id, "splitwire");
        assert_eq!(config.max_value_size, DEFAULT_MAX_VALUE_SIZE);
    }

    #[test]
    fn test_staging_path() {
        let config = SplitConfig::new().with_temp_dir("/var/tmp");
        assert_eq!(config.staging_path(), PathBuf::from("/var/tmp/splitwire"));

        let config = config.with_channel_id("job-17");
        assert_eq!(config.staging_path(), PathBuf::from("/var/tmp/job-17"));
    }

    #[test]
    fn test_builder_configuration() {
        let config = SplitConfig::new()
            .with_temp_dir("/scratch")
            .with_channel_id("dc")
            .with_max_value_size(1024);

        assert_eq!(config.temp_dir, PathBuf::from("/scratch"));
        assert_eq!(config.channel_id, "dc");
        assert_eq!(config.max_value_size, 1024);
    }
}
