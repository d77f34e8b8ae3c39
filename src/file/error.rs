use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Corrupted file {path}: length {len} is not a multiple of {unit}")]
    CorruptedFile { path: String, len: u64, unit: usize },
}

pub type FileResult<T> = Result<T, FileError>;
