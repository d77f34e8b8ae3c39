pub mod config;
pub mod file;
pub mod index;
pub mod record;
pub mod storage;
pub mod vector;

pub use config::{ConfigBuilder, ConfigError, EngineConfig};
pub use file::{FileError, FileResult, INTS_PER_PAGE, IntArray, PAGE_SIZE, PageId, PageStore};
pub use index::{ExtendibleHashIndex, HashIndexOptions, IndexError, IndexResult, MultiValueIndex};
pub use record::{FixedRecord, FixedRecordList, RecordError, RecordId, RecordResult};
pub use storage::{Storage, StorageError, StorageResult};
pub use vector::{ArenaStats, EMPTY_VECTOR, VectorArena, VectorError, VectorPos, VectorResult};

/// Current version of exstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
