//! One data directory, many named structures.
//!
//! A [`Storage`] owns the vector arena shared by every multi-value index it
//! opens. Other structures are handed out by value and bound to files under
//! `{data_dir}/{name}`.

use std::fs;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::{ConfigError, EngineConfig};
use crate::file::{FileError, IntArray, prefixed_path};
use crate::index::{ExtendibleHashIndex, IndexError, MultiValueIndex};
use crate::record::{FixedRecord, FixedRecordList, RecordError};
use crate::vector::{VectorArena, VectorError};

/// Name under which the shared vector arena is stored
const ARENA_NAME: &str = "vectors";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File error: {0}")]
    File(#[from] FileError),

    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Vector arena error: {0}")]
    Vector(#[from] VectorError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No structure named {0} in the data directory")]
    NotFound(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

pub struct Storage {
    config: EngineConfig,
    arena: VectorArena,
}

impl Storage {
    /// Open the data directory, creating it if needed
    pub fn open(config: EngineConfig) -> StorageResult<Self> {
        fs::create_dir_all(&config.data_dir)?;
        let arena = VectorArena::open(
            config.data_dir.join(ARENA_NAME),
            config.reset,
            config.cache_arena_info,
        )?;

        tracing::info!(
            data_dir = %config.data_dir.display(),
            reset = config.reset,
            "opened storage"
        );
        Ok(Self { config, arena })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// File prefix of structure `name`
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.config.data_dir.join(name)
    }

    /// Whether a hash index (plain or multi-value) named `name` exists on disk
    pub fn has_index(&self, name: &str) -> bool {
        prefixed_path(&self.path_of(name), "_dir").exists()
    }

    pub fn open_list<R: FixedRecord>(&self, name: &str) -> StorageResult<FixedRecordList<R>> {
        Ok(FixedRecordList::open(self.path_of(name), self.config.reset)?)
    }

    pub fn open_array(&self, name: &str) -> StorageResult<IntArray> {
        Ok(IntArray::open(self.path_of(name), self.config.reset)?)
    }

    pub fn open_index(&self, name: &str) -> StorageResult<ExtendibleHashIndex> {
        Ok(ExtendibleHashIndex::open(
            self.path_of(name),
            self.config.reset,
            self.config.index_options(),
        )?)
    }

    /// Open a multi-value index whose id sets live in the shared arena
    pub fn open_multi_index(&self, name: &str) -> StorageResult<MultiValueIndex> {
        Ok(MultiValueIndex::open(
            self.path_of(name),
            self.config.reset,
            self.config.index_options(),
        )?)
    }

    /// Like [`open_index`](Self::open_index), but never creates a missing index
    pub fn open_existing_index(&self, name: &str) -> StorageResult<ExtendibleHashIndex> {
        if !self.has_index(name) {
            return Err(StorageError::NotFound(name.to_string()));
        }
        self.open_index(name)
    }

    /// Like [`open_multi_index`](Self::open_multi_index), but never creates a missing index
    pub fn open_existing_multi_index(&self, name: &str) -> StorageResult<MultiValueIndex> {
        if !self.has_index(name) {
            return Err(StorageError::NotFound(name.to_string()));
        }
        self.open_multi_index(name)
    }

    /// The vector arena shared by multi-value indexes
    pub fn arena_mut(&mut self) -> &mut VectorArena {
        &mut self.arena
    }

    /// Flush the shared arena. Structures handed out are flushed by their holders.
    pub fn flush(&mut self) -> StorageResult<()> {
        self.arena.flush()?;
        Ok(())
    }
}
