//! Engine configuration
//!
//! Defaults cover the common case; a config can be built in code with
//! [`EngineConfig::builder`] or loaded from a JSON file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::index::{DEFAULT_MAX_GLOBAL_DEPTH, HashIndexOptions};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings shared by every structure a [`Storage`](crate::Storage) opens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding every file. Structure `name` uses files prefixed `{data_dir}/{name}`.
    pub data_dir: PathBuf,

    /// Discard existing data when opening
    pub reset: bool,

    /// Cap on the global depth of hash directories
    pub max_global_depth: u32,

    /// Keep hash directories in memory
    pub cache_directory: bool,

    /// Keep the vector arena's page info in memory
    pub cache_arena_info: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./exstore_data"),
            reset: false,
            max_global_depth: DEFAULT_MAX_GLOBAL_DEPTH,
            cache_directory: true,
            cache_arena_info: true,
        }
    }
}

impl EngineConfig {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Read a config from a JSON file. Missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(&self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Options for hash indexes opened under this config
    pub fn index_options(&self) -> HashIndexOptions {
        HashIndexOptions {
            max_global_depth: self.max_global_depth,
            cache_directory: self.cache_directory,
        }
    }
}

/// Builder for [`EngineConfig`]
#[derive(Default)]
pub struct ConfigBuilder {
    config: EngineConfig,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Discard existing data when opening
    pub fn reset(mut self, reset: bool) -> Self {
        self.config.reset = reset;
        self
    }

    /// Set the cap on hash directory depth
    pub fn max_global_depth(mut self, depth: u32) -> Self {
        self.config.max_global_depth = depth;
        self
    }

    pub fn cache_directory(mut self, cache: bool) -> Self {
        self.config.cache_directory = cache;
        self
    }

    pub fn cache_arena_info(mut self, cache: bool) -> Self {
        self.config.cache_arena_info = cache;
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}
