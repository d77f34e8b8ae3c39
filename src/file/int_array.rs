use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::error::{FileError, FileResult};
use super::{WORD_SIZE, bytes_to_words, words_to_bytes};

/// A resizable on-disk array of 32-bit integers.
///
/// The file is a raw sequence of little-endian words with no header; the
/// element count is the file length divided by 4. The array can be switched
/// into a cached mode where every element lives in memory; both modes expose
/// the same contents. Indices are not checked in release builds.
pub struct IntArray {
    path: PathBuf,
    file: File,
    len: usize,
    /// Process-resident copy, present only in cached mode
    cache: Option<Vec<i32>>,
}

impl IntArray {
    /// Open (or create) an array file. With `reset`, existing content is discarded.
    pub fn open<P: AsRef<Path>>(path: P, reset: bool) -> FileResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(reset)
            .open(path)?;

        let byte_len = file.metadata()?.len();
        if byte_len % WORD_SIZE as u64 != 0 {
            return Err(FileError::CorruptedFile {
                path: path.display().to_string(),
                len: byte_len,
                unit: WORD_SIZE,
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
            len: (byte_len / WORD_SIZE as u64) as usize,
            cache: None,
        })
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the array has no elements
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the array is currently held in memory
    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// Read element `index`
    pub fn get(&mut self, index: usize) -> FileResult<i32> {
        debug_assert!(index < self.len);
        if let Some(cache) = &self.cache {
            return Ok(cache[index]);
        }

        let mut bytes = [0u8; WORD_SIZE];
        self.file
            .seek(SeekFrom::Start((index * WORD_SIZE) as u64))?;
        self.file.read_exact(&mut bytes)?;
        Ok(i32::from_le_bytes(bytes))
    }

    /// Overwrite element `index`
    pub fn set(&mut self, index: usize, value: i32) -> FileResult<()> {
        debug_assert!(index < self.len);
        if let Some(cache) = &mut self.cache {
            cache[index] = value;
            return Ok(());
        }

        self.file
            .seek(SeekFrom::Start((index * WORD_SIZE) as u64))?;
        self.file.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    /// Append an element and return its index
    pub fn push_back(&mut self, value: i32) -> FileResult<usize> {
        let index = self.len;
        match &mut self.cache {
            Some(cache) => cache.push(value),
            None => {
                self.file
                    .seek(SeekFrom::Start((index * WORD_SIZE) as u64))?;
                self.file.write_all(&value.to_le_bytes())?;
            }
        }
        self.len += 1;
        Ok(index)
    }

    /// Load every element into memory and serve further accesses from there
    pub fn cache(&mut self) -> FileResult<()> {
        if self.cache.is_none() {
            let words = self.read_all()?;
            self.cache = Some(words);
        }
        Ok(())
    }

    /// Write the cached elements back and return to file-backed mode
    pub fn flush(&mut self) -> FileResult<()> {
        self.sync()?;
        self.cache = None;
        Ok(())
    }

    /// Write the cached elements back while staying cached
    pub fn sync(&mut self) -> FileResult<()> {
        if let Some(cache) = &self.cache {
            let mut bytes = vec![0u8; cache.len() * WORD_SIZE];
            words_to_bytes(cache, &mut bytes);
            self.file.seek(SeekFrom::Start(0))?;
            self.file.write_all(&bytes)?;
            self.file.set_len(bytes.len() as u64)?;
        }
        self.file.sync_data()?;
        Ok(())
    }

    /// Append a copy of the current contents, doubling the length
    pub fn double_size(&mut self) -> FileResult<()> {
        match &mut self.cache {
            Some(cache) => cache.extend_from_within(..),
            None => {
                let words = self.read_all()?;
                let mut bytes = vec![0u8; words.len() * WORD_SIZE];
                words_to_bytes(&words, &mut bytes);
                self.file
                    .seek(SeekFrom::Start((self.len * WORD_SIZE) as u64))?;
                self.file.write_all(&bytes)?;
            }
        }
        self.len *= 2;
        tracing::debug!(path = %self.path.display(), len = self.len, "doubled int array");
        Ok(())
    }

    /// Keep only the first half of the elements
    pub fn halve_size(&mut self) -> FileResult<()> {
        let half = self.len / 2;
        match &mut self.cache {
            Some(cache) => cache.truncate(half),
            None => self.file.set_len((half * WORD_SIZE) as u64)?,
        }
        self.len = half;
        tracing::debug!(path = %self.path.display(), len = self.len, "halved int array");
        Ok(())
    }

    fn read_all(&mut self) -> FileResult<Vec<i32>> {
        let mut bytes = vec![0u8; self.len * WORD_SIZE];
        self.file.seek(SeekFrom::Start(0))?;
        self.file.read_exact(&mut bytes)?;
        let mut words = vec![0i32; self.len];
        bytes_to_words(&bytes, &mut words);
        Ok(words)
    }
}

impl Drop for IntArray {
    fn drop(&mut self) {
        if self.cache.is_some() {
            let _ = self.flush();
        }
    }
}
