//! Page files and integer arrays: the on-disk building blocks every other
//! structure is laid out on.

mod error;
mod int_array;
mod page_store;

use std::path::{Path, PathBuf};

pub use error::{FileError, FileResult};
pub use int_array::IntArray;
pub use page_store::{INFO_SLOTS, PageStore};

/// Page size in bytes (4KB)
pub const PAGE_SIZE: usize = 4096;

/// Number of 32-bit words in one page
pub const INTS_PER_PAGE: usize = PAGE_SIZE / WORD_SIZE;

/// Size of one stored word in bytes
pub const WORD_SIZE: usize = std::mem::size_of::<i32>();

/// Page ID type. Data pages are 1-based; page 0 is the metadata page.
pub type PageId = u32;

/// Encode a slice of words into little-endian bytes
pub(crate) fn words_to_bytes(words: &[i32], dest: &mut [u8]) {
    debug_assert_eq!(words.len() * WORD_SIZE, dest.len());
    for (chunk, word) in dest.chunks_exact_mut(WORD_SIZE).zip(words) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
}

/// Decode little-endian bytes into a slice of words
pub(crate) fn bytes_to_words(src: &[u8], dest: &mut [i32]) {
    debug_assert_eq!(dest.len() * WORD_SIZE, src.len());
    for (word, chunk) in dest.iter_mut().zip(src.chunks_exact(WORD_SIZE)) {
        *word = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
}

/// Build the path of a companion file: `<prefix><suffix>`
pub fn prefixed_path(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = prefix.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
