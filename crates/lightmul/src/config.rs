//! Configuration for the light loader

use crate::error::{LightError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for [`crate::LightsLoader`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightsConfig {
    /// Directory holding the client's `.mul` files
    pub base_path: PathBuf,

    /// Data file name, resolved against `base_path`
    pub data_file: String,

    /// Index file name, resolved against `base_path`
    pub index_file: String,

    /// Number of identifier slots in the index
    pub max_count: usize,

    /// Memory-map the data file instead of reading through a file handle
    pub use_memory_mapping: bool,

    /// Log lookup failures at error level instead of warning
    pub strict: bool,
}

impl Default for LightsConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            data_file: crate::DEFAULT_DATA_FILE.to_string(),
            index_file: crate::DEFAULT_INDEX_FILE.to_string(),
            max_count: crate::MAX_LIGHTS_DATA_INDEX_COUNT,
            use_memory_mapping: true,
            strict: false,
        }
    }
}

impl LightsConfig {
    /// Create a new configuration rooted at the given base path
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Parse a configuration from JSON, filling missing fields with defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LightError::FileNotFound(path.to_path_buf()),
            _ => LightError::Io(e),
        })?;
        Self::from_json_str(&json)
    }

    /// Set the base path
    #[must_use]
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.base_path = path.as_ref().to_path_buf();
        self
    }

    /// Set the data and index file names
    #[must_use]
    pub fn with_files(mut self, data_file: impl Into<String>, index_file: impl Into<String>) -> Self {
        self.data_file = data_file.into();
        self.index_file = index_file.into();
        self
    }

    /// Set the number of identifier slots
    #[must_use]
    pub const fn with_max_count(mut self, max_count: usize) -> Self {
        self.max_count = max_count;
        self
    }

    /// Enable or disable memory mapping
    #[must_use]
    pub const fn with_memory_mapping(mut self, enable: bool) -> Self {
        self.use_memory_mapping = enable;
        self
    }

    /// Enable or disable strict failure logging
    #[must_use]
    pub const fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.max_count == 0 {
            return Err(LightError::Config("max_count must be at least 1".to_string()));
        }
        if u32::try_from(self.max_count).is_err() {
            return Err(LightError::Config(format!(
                "max_count {} exceeds the identifier range",
                self.max_count
            )));
        }
        if self.data_file.is_empty() || self.index_file.is_empty() {
            return Err(LightError::Config(
                "data_file and index_file must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
