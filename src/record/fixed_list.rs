use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use super::codec::FixedRecord;
use super::error::RecordResult;
use super::RecordId;
use crate::file::FileError;

/// An append/update list of fixed-size records stored back to back in one file.
///
/// Record `id` (1-based) lives at byte offset `(id - 1) * R::SIZE`. Ids are
/// handed out sequentially and never reused; records are updated in place and
/// never move. There is no delete: callers mark records dead in their own
/// fields if they need to.
pub struct FixedRecordList<R: FixedRecord> {
    path: PathBuf,
    file: File,
    len: u32,
    /// Reusable encode/decode buffer (`R::SIZE` bytes)
    buffer: Vec<u8>,
    _record: PhantomData<R>,
}

impl<R: FixedRecord> FixedRecordList<R> {
    /// Open (or create) a record file. With `reset`, existing records are discarded.
    pub fn open<P: AsRef<Path>>(path: P, reset: bool) -> RecordResult<Self> {
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
        if byte_len % R::SIZE as u64 != 0 {
            return Err(FileError::CorruptedFile {
                path: path.display().to_string(),
                len: byte_len,
                unit: R::SIZE,
            }
            .into());
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
            len: (byte_len / R::SIZE as u64) as u32,
            buffer: vec![0u8; R::SIZE],
            _record: PhantomData,
        })
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records ever inserted
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Check if no record was inserted yet
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append a record and return its id
    pub fn insert(&mut self, record: &R) -> RecordResult<RecordId> {
        let id = self.len + 1;
        self.write_at(id, record)?;
        self.len = id;
        Ok(id)
    }

    /// Read record `id`
    pub fn read(&mut self, id: RecordId) -> RecordResult<R> {
        debug_assert!(id >= 1 && id <= self.len);
        self.file.seek(SeekFrom::Start(Self::offset(id)))?;
        self.file.read_exact(&mut self.buffer)?;
        R::decode(&self.buffer)
    }

    /// Overwrite record `id` in place
    pub fn update(&mut self, id: RecordId, record: &R) -> RecordResult<()> {
        debug_assert!(id >= 1 && id <= self.len);
        self.write_at(id, record)
    }

    /// Read every record in id order
    pub fn scan(&mut self) -> RecordResult<Vec<(RecordId, R)>> {
        let mut bytes = vec![0u8; self.len as usize * R::SIZE];
        self.file.seek(SeekFrom::Start(0))?;
        self.file.read_exact(&mut bytes)?;

        bytes
            .chunks_exact(R::SIZE)
            .zip(1..)
            .map(|(chunk, id)| Ok((id, R::decode(chunk)?)))
            .collect()
    }

    /// Sync the file to disk
    pub fn flush(&mut self) -> RecordResult<()> {
        self.file.sync_data()?;
        Ok(())
    }

    fn write_at(&mut self, id: RecordId, record: &R) -> RecordResult<()> {
        record.encode(&mut self.buffer);
        self.file.seek(SeekFrom::Start(Self::offset(id)))?;
        self.file.write_all(&self.buffer)?;
        Ok(())
    }

    fn offset(id: RecordId) -> u64 {
        (id as u64 - 1) * R::SIZE as u64
    }
}
