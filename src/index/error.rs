use thiserror::Error;

use crate::file::FileError;
use crate::vector::VectorError;

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Errors that can occur during index operations
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("File error: {0}")]
    File(#[from] FileError),

    #[error("Vector arena error: {0}")]
    Vector(#[from] VectorError),

    #[error("Hash directory cannot grow beyond global depth {max_depth}: keys too skewed or buckets too small")]
    DirectoryOverflow { max_depth: u32 },
}
