use thiserror::Error;

use crate::file::{FileError, PageId};

/// Result type for vector arena operations
pub type VectorResult<T> = Result<T, VectorError>;

#[derive(Debug, Error)]
pub enum VectorError {
    #[error("File error: {0}")]
    File(#[from] FileError),

    #[error("Corrupted page info for page {page}: {words:?}")]
    CorruptedInfo { page: PageId, words: [i32; 3] },
}
