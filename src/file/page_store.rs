use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::error::{FileError, FileResult};
use super::{INTS_PER_PAGE, PAGE_SIZE, PageId, bytes_to_words, words_to_bytes};

/// Metadata slot holding the head of the free-page list (0 = empty)
const FREE_HEAD_SLOT: usize = 0;

/// Metadata slots reserved by the store itself; user info slots follow them
const RESERVED_SLOTS: usize = 1;

/// Number of info slots available to the structure owning the store
pub const INFO_SLOTS: usize = INTS_PER_PAGE - RESERVED_SLOTS;

/// The single page currently held in memory.
///
/// `id == 0` means nothing is bound: page 0 is the metadata page and is kept
/// separately, so it never occupies this buffer.
struct ActivePage {
    id: PageId,
    words: Vec<i32>,
    dirty: bool,
}

/// A file of fixed-size pages with a metadata page and free-page recycling.
///
/// Page 0 holds the metadata words (free-list head plus caller info slots).
/// Data pages are 1-based. A freed page stores the previous free-list head in
/// its first word; the rest of its payload is left untouched.
///
/// Exactly one data page is cached. Touching a different page writes the
/// cached one back first if it was modified.
pub struct PageStore {
    path: PathBuf,
    file: File,
    /// Number of pages in the file, metadata page included
    page_count: u32,
    meta: Vec<i32>,
    meta_dirty: bool,
    active: ActivePage,
    /// Reusable buffer for page I/O
    io_buffer: Vec<u8>,
}

impl PageStore {
    /// Open (or create) a page file. With `reset`, existing content is discarded.
    pub fn open<P: AsRef<Path>>(path: P, reset: bool) -> FileResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(reset)
            .open(path)?;

        let mut len = file.metadata()?.len();
        if len % PAGE_SIZE as u64 != 0 {
            return Err(FileError::CorruptedFile {
                path: path.display().to_string(),
                len,
                unit: PAGE_SIZE,
            });
        }
        if len == 0 {
            file.set_len(PAGE_SIZE as u64)?;
            len = PAGE_SIZE as u64;
        }

        let mut io_buffer = vec![0u8; PAGE_SIZE];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut io_buffer)?;
        let mut meta = vec![0i32; INTS_PER_PAGE];
        bytes_to_words(&io_buffer, &mut meta);

        let page_count = (len / PAGE_SIZE as u64) as u32;
        tracing::debug!(
            path = %path.display(),
            reset,
            pages = page_count - 1,
            "opened page store"
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            page_count,
            meta,
            meta_dirty: false,
            active: ActivePage {
                id: 0,
                words: vec![0; INTS_PER_PAGE],
                dirty: false,
            },
            io_buffer,
        })
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of data pages in the file (live and free)
    pub fn page_count(&self) -> u32 {
        self.page_count - 1
    }

    /// Allocate a page, recycling the free-list head when there is one.
    ///
    /// The link word of a recycled page is cleared; the rest of its payload is
    /// whatever it held before it was freed.
    pub fn new_page(&mut self) -> FileResult<PageId> {
        let head = self.meta[FREE_HEAD_SLOT] as PageId;
        if head != 0 {
            let mut link = [0i32];
            self.read_part(head, 0, &mut link)?;
            self.write_part(head, 0, &[0])?;
            self.meta[FREE_HEAD_SLOT] = link[0];
            self.meta_dirty = true;
            tracing::trace!(page = head, "recycled free page");
            return Ok(head);
        }

        let page_id = self.page_count;
        self.page_count += 1;
        self.file
            .set_len(self.page_count as u64 * PAGE_SIZE as u64)?;
        tracing::trace!(page = page_id, "extended page file");
        Ok(page_id)
    }

    /// Release a page onto the free list
    pub fn delete_page(&mut self, page_id: PageId) -> FileResult<()> {
        debug_assert!(page_id != 0 && page_id < self.page_count);
        let head = self.meta[FREE_HEAD_SLOT];
        self.write_part(page_id, 0, &[head])?;
        self.meta[FREE_HEAD_SLOT] = page_id as i32;
        self.meta_dirty = true;
        tracing::trace!(page = page_id, "freed page");
        Ok(())
    }

    /// Bring a page into the cache, writing back the previously cached one
    pub fn fetch_page(&mut self, page_id: PageId) -> FileResult<()> {
        self.bind(page_id, true)
    }

    /// Write the cached page and the metadata page to disk
    pub fn flush(&mut self) -> FileResult<()> {
        self.evict()?;
        if self.meta_dirty {
            words_to_bytes(&self.meta, &mut self.io_buffer);
            self.file.seek(SeekFrom::Start(0))?;
            self.file.write_all(&self.io_buffer)?;
            self.meta_dirty = false;
        }
        self.file.sync_data()?;
        Ok(())
    }

    /// Read a whole page into `dest` (`INTS_PER_PAGE` words)
    pub fn read_page(&mut self, page_id: PageId, dest: &mut [i32]) -> FileResult<()> {
        debug_assert_eq!(dest.len(), INTS_PER_PAGE);
        self.read_part(page_id, 0, dest)
    }

    /// Overwrite a whole page with `src` (`INTS_PER_PAGE` words)
    pub fn write_page(&mut self, page_id: PageId, src: &[i32]) -> FileResult<()> {
        debug_assert_eq!(src.len(), INTS_PER_PAGE);
        // No need to load what is about to be replaced entirely
        self.bind(page_id, false)?;
        self.active.words.copy_from_slice(src);
        self.active.dirty = true;
        Ok(())
    }

    /// Read `dest.len()` words starting at word `offset` of a page.
    /// The range must stay within the page.
    pub fn read_part(&mut self, page_id: PageId, offset: usize, dest: &mut [i32]) -> FileResult<()> {
        debug_assert!(offset + dest.len() <= INTS_PER_PAGE);
        self.bind(page_id, true)?;
        dest.copy_from_slice(&self.active.words[offset..offset + dest.len()]);
        Ok(())
    }

    /// Write `src` starting at word `offset` of a page.
    /// The range must stay within the page.
    pub fn write_part(&mut self, page_id: PageId, offset: usize, src: &[i32]) -> FileResult<()> {
        debug_assert!(offset + src.len() <= INTS_PER_PAGE);
        self.bind(page_id, true)?;
        self.active.words[offset..offset + src.len()].copy_from_slice(src);
        self.active.dirty = true;
        Ok(())
    }

    /// Read a caller info slot of the metadata page
    pub fn info(&self, slot: usize) -> i32 {
        debug_assert!(slot < INFO_SLOTS);
        self.meta[RESERVED_SLOTS + slot]
    }

    /// Write a caller info slot of the metadata page
    pub fn set_info(&mut self, slot: usize, value: i32) {
        debug_assert!(slot < INFO_SLOTS);
        self.meta[RESERVED_SLOTS + slot] = value;
        self.meta_dirty = true;
    }

    /// Pack a (page, word offset) pair into one 32-bit position
    pub fn to_position(page_id: PageId, offset: u32) -> u32 {
        debug_assert!((offset as usize) < INTS_PER_PAGE);
        page_id * INTS_PER_PAGE as u32 + offset
    }

    /// Unpack a position produced by [`PageStore::to_position`]
    pub fn to_page_offset(position: u32) -> (PageId, u32) {
        (
            position / INTS_PER_PAGE as u32,
            position % INTS_PER_PAGE as u32,
        )
    }

    /// Check whether a page is the one currently cached
    pub fn is_cached(&self, page_id: PageId) -> bool {
        self.active.id == page_id && page_id != 0
    }

    /// Make `page_id` the cached page. With `load`, its content is read from disk.
    fn bind(&mut self, page_id: PageId, load: bool) -> FileResult<()> {
        debug_assert!(page_id != 0 && page_id < self.page_count);
        if self.active.id == page_id {
            return Ok(());
        }
        self.evict()?;

        if load {
            self.file
                .seek(SeekFrom::Start(page_id as u64 * PAGE_SIZE as u64))?;
            self.file.read_exact(&mut self.io_buffer)?;
            bytes_to_words(&self.io_buffer, &mut self.active.words);
        }
        self.active.id = page_id;
        Ok(())
    }

    /// Write back the cached page if it was modified, and unbind it
    fn evict(&mut self) -> FileResult<()> {
        if self.active.id != 0 && self.active.dirty {
            words_to_bytes(&self.active.words, &mut self.io_buffer);
            self.file
                .seek(SeekFrom::Start(self.active.id as u64 * PAGE_SIZE as u64))?;
            self.file.write_all(&self.io_buffer)?;
        }
        self.active.id = 0;
        self.active.dirty = false;
        Ok(())
    }
}

impl Drop for PageStore {
    fn drop(&mut self) {
        // Write back the cached page and metadata when the store is dropped
        let _ = self.flush();
    }
}
