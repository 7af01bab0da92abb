//! Configuration for sstkv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{KvError, Result};

/// Main configuration for an sstkv instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding the segment files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── 0.sst
    ///     ├── 1.sst
    ///     └── ...
    pub data_dir: PathBuf,

    /// Byte length at which the current segment stops taking appends.
    /// Checked before each append, so a segment may overshoot by one record.
    pub segment_size_threshold: u64,

    /// fsync the segment after every append
    pub sync_writes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./sstkv_data"),
            segment_size_threshold: 4 * 1024 * 1024, // 4 MB
            sync_writes: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that the configuration can back an engine
    pub fn validate(&self) -> Result<()> {
        if self.segment_size_threshold == 0 {
            return Err(KvError::Config(
                "segment_size_threshold must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the segment rollover threshold (in bytes)
    pub fn segment_size_threshold(mut self, bytes: u64) -> Self {
        self.config.segment_size_threshold = bytes;
        self
    }

    /// Enable or disable fsync after each append
    pub fn sync_writes(mut self, sync: bool) -> Self {
        self.config.sync_writes = sync;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
