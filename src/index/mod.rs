//! Hash indexes over byte keys.
//!
//! [`ExtendibleHashIndex`] maps a key to one non-zero value;
//! [`MultiValueIndex`] maps a key to a set of record ids kept in a
//! [`VectorArena`](crate::vector::VectorArena).

mod bucket;
mod error;
mod extendible;
mod hash;
mod multi;
#[cfg(test)]
mod tests;

pub use bucket::PAIRS_PER_PAGE;
pub use error::{IndexError, IndexResult};
pub use extendible::ExtendibleHashIndex;
pub use hash::hash_key;
pub use multi::MultiValueIndex;

/// Default cap on the directory's global depth (16M slots)
pub const DEFAULT_MAX_GLOBAL_DEPTH: u32 = 24;

/// Tuning knobs for opening a hash index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashIndexOptions {
    /// Inserting past this global depth fails with [`IndexError::DirectoryOverflow`]
    pub max_global_depth: u32,
    /// Keep the directory in memory while the index is open
    pub cache_directory: bool,
}

impl Default for HashIndexOptions {
    fn default() -> Self {
        Self {
            max_global_depth: DEFAULT_MAX_GLOBAL_DEPTH,
            cache_directory: true,
        }
    }
}
