use std::collections::BTreeSet;
use std::path::Path;

use serde::Serialize;

use super::error::{VectorError, VectorResult};
use super::page_info::{INFO_WORDS, PageInfo};
use super::{EMPTY_VECTOR, VectorPos};
use crate::file::{INTS_PER_PAGE, IntArray, PageId, PageStore, prefixed_path};

/// Number of small capacity classes: capacities 1, 2, 4, ..., 512
pub const CAPACITY_CLASSES: usize = INTS_PER_PAGE.trailing_zeros() as usize;

/// Page usage summary returned by [`VectorArena::stats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArenaStats {
    /// Data pages in the file, live and free
    pub pages: u32,
    /// Small-vector pages per capacity class (index = log2 of the capacity)
    pub small_pages: [u32; CAPACITY_CLASSES],
    /// Number of large vectors
    pub large_vectors: u32,
    /// Pages held by large vectors
    pub large_pages: u32,
    /// Pages not in use
    pub free_pages: u32,
}

/// Storage for many variable-length vectors of non-zero integers.
///
/// Small vectors (capacity a power of two below a page) share pages with
/// vectors of the same capacity. Large vectors own a chain of whole pages and
/// never move once they are large. A vector is addressed by its position; any
/// mutating call may return a new position, which the caller must keep.
///
/// Files: `<prefix>_info` (page info, three words per page) and `<prefix>_data`.
pub struct VectorArena {
    info: IntArray,
    data: PageStore,
    /// Small-vector pages with at least one free cell, per capacity class
    free_pages: [BTreeSet<PageId>; CAPACITY_CLASSES],
    page_buffer: Vec<i32>,
}

impl VectorArena {
    /// Open (or create) an arena. With `reset`, every vector is discarded.
    pub fn open<P: AsRef<Path>>(prefix: P, reset: bool, cache_info: bool) -> VectorResult<Self> {
        let prefix = prefix.as_ref();
        let mut info = IntArray::open(prefixed_path(prefix, "_info"), reset)?;
        let data = PageStore::open(prefixed_path(prefix, "_data"), reset)?;
        if cache_info {
            info.cache()?;
        }

        let mut arena = Self {
            info,
            data,
            free_pages: Default::default(),
            page_buffer: vec![0; INTS_PER_PAGE],
        };

        let pages = (arena.info.len() / INFO_WORDS) as PageId;
        for page in 1..=pages {
            if let PageInfo::Small {
                capacity,
                free_head,
                watermark,
            } = arena.page_info(page)?
                && (free_head.is_some() || (watermark as usize) < INTS_PER_PAGE)
            {
                arena.free_pages[class_of(capacity)].insert(page);
            }
        }

        tracing::debug!(prefix = %prefix.display(), reset, pages, "opened vector arena");
        Ok(arena)
    }

    /// Read a vector. Trailing padding is not part of the result.
    pub fn get_data(&mut self, pos: VectorPos) -> VectorResult<Vec<i32>> {
        if pos == EMPTY_VECTOR {
            return Ok(Vec::new());
        }
        let (page, offset) = PageStore::to_page_offset(pos);

        let mut result = match self.page_info(page)? {
            PageInfo::Small { capacity, .. } => {
                let mut cell = vec![0; capacity as usize];
                self.data.read_part(page, offset as usize, &mut cell)?;
                cell
            }
            PageInfo::LargeHead { capacity, .. } => {
                let mut words = Vec::with_capacity(capacity as usize);
                let mut current = page;
                while current != 0 {
                    self.data.read_page(current, &mut self.page_buffer)?;
                    words.extend_from_slice(&self.page_buffer);
                    current = self.page_info(current)?.next();
                }
                words
            }
            other => return Err(corrupted(page, other)),
        };

        while result.last() == Some(&0) {
            result.pop();
        }
        Ok(result)
    }

    /// Capacity of a vector in elements (0 for the empty vector)
    pub fn capacity(&mut self, pos: VectorPos) -> VectorResult<u32> {
        if pos == EMPTY_VECTOR {
            return Ok(0);
        }
        let (page, _) = PageStore::to_page_offset(pos);
        Ok(match self.page_info(page)? {
            PageInfo::Small { capacity, .. } | PageInfo::LargeHead { capacity, .. } => capacity,
            _ => 0,
        })
    }

    /// Append one element and return the (possibly new) position
    pub fn push_back(&mut self, pos: VectorPos, value: i32) -> VectorResult<VectorPos> {
        debug_assert!(value != 0, "0 is reserved as padding");
        let capacity = self.capacity(pos)?;

        if (capacity as usize) < INTS_PER_PAGE {
            let mut data = self.get_data(pos)?;
            data.push(value);
            if data.len() <= capacity as usize {
                let (page, offset) = PageStore::to_page_offset(pos);
                self.data.write_part(page, offset as usize, &data)?;
                return Ok(pos);
            }

            let new_capacity = if pos == EMPTY_VECTOR { 1 } else { capacity * 2 };
            self.release(pos, capacity)?;
            let new_pos = self.allocate(new_capacity)?;
            let (page, offset) = PageStore::to_page_offset(new_pos);
            self.data.write_part(page, offset as usize, &data)?;
            return Ok(new_pos);
        }

        // Large: fill the tail page, chaining a new page when it is full
        let (head, _) = PageStore::to_page_offset(pos);
        let last = match self.page_info(head)? {
            PageInfo::LargeHead { last, .. } => last,
            other => return Err(corrupted(head, other)),
        };
        self.data.read_page(last, &mut self.page_buffer)?;
        let used = self
            .page_buffer
            .iter()
            .rposition(|&word| word != 0)
            .map_or(0, |index| index + 1);
        if used < INTS_PER_PAGE {
            self.data.write_part(last, used, &[value])?;
        } else {
            let page = self.append_page(head)?;
            self.data.write_part(page, 0, &[value])?;
        }
        Ok(pos)
    }

    /// Replace a vector's contents and return the (possibly new) position.
    /// Empty `data` deletes the vector.
    pub fn rewrite(&mut self, pos: VectorPos, data: &[i32]) -> VectorResult<VectorPos> {
        debug_assert!(data.iter().all(|&v| v != 0), "0 is reserved as padding");
        if data.is_empty() {
            return self.del(pos);
        }
        let capacity = self.capacity(pos)?;

        let head = if (capacity as usize) < INTS_PER_PAGE {
            if data.len() <= capacity as usize {
                let (page, offset) = PageStore::to_page_offset(pos);
                let mut cell = data.to_vec();
                cell.resize(capacity as usize, 0);
                self.data.write_part(page, offset as usize, &cell)?;
                return Ok(pos);
            }

            let new_capacity = data.len().next_power_of_two().min(INTS_PER_PAGE) as u32;
            self.release(pos, capacity)?;
            let new_pos = self.allocate(new_capacity)?;
            if (new_capacity as usize) < INTS_PER_PAGE {
                let (page, offset) = PageStore::to_page_offset(new_pos);
                let mut cell = data.to_vec();
                cell.resize(new_capacity as usize, 0);
                self.data.write_part(page, offset as usize, &cell)?;
                return Ok(new_pos);
            }
            PageStore::to_page_offset(new_pos).0
        } else {
            PageStore::to_page_offset(pos).0
        };

        self.rewrite_chain(head, data)?;
        Ok(PageStore::to_position(head, 0))
    }

    /// Delete a vector. Returns the empty position.
    pub fn del(&mut self, pos: VectorPos) -> VectorResult<VectorPos> {
        if pos == EMPTY_VECTOR {
            return Ok(EMPTY_VECTOR);
        }
        let capacity = self.capacity(pos)?;
        self.release(pos, capacity)?;
        Ok(EMPTY_VECTOR)
    }

    /// Summarize page usage
    pub fn stats(&mut self) -> VectorResult<ArenaStats> {
        let mut stats = ArenaStats {
            pages: self.data.page_count(),
            ..ArenaStats::default()
        };
        let described = (self.info.len() / INFO_WORDS) as PageId;
        for page in 1..=described {
            match self.page_info(page)? {
                PageInfo::Unused => stats.free_pages += 1,
                PageInfo::Small { capacity, .. } => stats.small_pages[class_of(capacity)] += 1,
                PageInfo::LargeHead { .. } => {
                    stats.large_vectors += 1;
                    stats.large_pages += 1;
                }
                PageInfo::LargeTail { .. } => stats.large_pages += 1,
            }
        }
        Ok(stats)
    }

    /// Write the cached data page, the page metadata and the page info to disk
    pub fn flush(&mut self) -> VectorResult<()> {
        self.data.flush()?;
        self.info.sync()?;
        Ok(())
    }

    fn page_info(&mut self, page: PageId) -> VectorResult<PageInfo> {
        let base = (page as usize - 1) * INFO_WORDS;
        let words = [
            self.info.get(base)?,
            self.info.get(base + 1)?,
            self.info.get(base + 2)?,
        ];
        PageInfo::decode(page, words)
    }

    fn set_page_info(&mut self, page: PageId, info: PageInfo) -> VectorResult<()> {
        let base = (page as usize - 1) * INFO_WORDS;
        for (i, word) in info.encode().into_iter().enumerate() {
            self.info.set(base + i, word)?;
        }
        Ok(())
    }

    /// Take a data page and zero it
    fn new_page(&mut self) -> VectorResult<PageId> {
        let page = self.data.new_page()?;
        while self.info.len() < page as usize * INFO_WORDS {
            self.info.push_back(0)?;
        }
        self.page_buffer.fill(0);
        self.data.write_page(page, &self.page_buffer)?;
        Ok(page)
    }

    fn delete_page(&mut self, page: PageId) -> VectorResult<()> {
        self.set_page_info(page, PageInfo::Unused)?;
        self.data.delete_page(page)?;
        Ok(())
    }

    /// A small-vector page of the given capacity with room for one more cell
    fn page_of_class(&mut self, capacity: u32) -> VectorResult<PageId> {
        if let Some(&page) = self.free_pages[class_of(capacity)].first() {
            return Ok(page);
        }
        let page = self.new_page()?;
        self.set_page_info(
            page,
            PageInfo::Small {
                capacity,
                free_head: None,
                watermark: 0,
            },
        )?;
        self.free_pages[class_of(capacity)].insert(page);
        tracing::trace!(page, capacity, "new small-vector page");
        Ok(page)
    }

    /// Allocate zeroed space of `capacity` (a power of two, at most one page)
    fn allocate(&mut self, capacity: u32) -> VectorResult<VectorPos> {
        debug_assert!(capacity.is_power_of_two() && capacity as usize <= INTS_PER_PAGE);

        if capacity as usize == INTS_PER_PAGE {
            let page = self.new_page()?;
            self.set_page_info(
                page,
                PageInfo::LargeHead {
                    capacity,
                    next: 0,
                    last: page,
                },
            )?;
            tracing::debug!(page, "promoted vector to a large vector");
            return Ok(PageStore::to_position(page, 0));
        }

        let page = self.page_of_class(capacity)?;
        let info = self.page_info(page)?;
        let PageInfo::Small {
            free_head,
            watermark,
            ..
        } = info
        else {
            return Err(corrupted(page, info));
        };

        let (offset, free_head, watermark) = match free_head {
            Some(head) => {
                let mut link = [0i32];
                self.data.read_part(page, head as usize, &mut link)?;
                let next = (link[0] >= 0).then_some(link[0] as u32);
                (head, next, watermark)
            }
            None => (watermark, None, watermark + capacity),
        };
        if free_head.is_none() && watermark as usize == INTS_PER_PAGE {
            self.free_pages[class_of(capacity)].remove(&page);
        }
        self.set_page_info(
            page,
            PageInfo::Small {
                capacity,
                free_head,
                watermark,
            },
        )?;

        self.data
            .write_part(page, offset as usize, &vec![0; capacity as usize])?;
        Ok(PageStore::to_position(page, offset))
    }

    /// Give back the space of a vector of known capacity
    fn release(&mut self, pos: VectorPos, capacity: u32) -> VectorResult<()> {
        if pos == EMPTY_VECTOR || capacity == 0 {
            return Ok(());
        }
        let (page, offset) = PageStore::to_page_offset(pos);

        if capacity as usize >= INTS_PER_PAGE {
            let mut current = page;
            while current != 0 {
                let next = self.page_info(current)?.next();
                self.delete_page(current)?;
                current = next;
            }
            return Ok(());
        }

        let info = self.page_info(page)?;
        let PageInfo::Small {
            free_head,
            watermark,
            ..
        } = info
        else {
            return Err(corrupted(page, info));
        };
        let class = class_of(capacity);

        if offset + capacity == watermark {
            if offset == 0 {
                self.free_pages[class].remove(&page);
                self.delete_page(page)?;
                tracing::trace!(page, capacity, "released empty small-vector page");
                return Ok(());
            }
            self.set_page_info(
                page,
                PageInfo::Small {
                    capacity,
                    free_head,
                    watermark: offset,
                },
            )?;
        } else {
            let link = free_head.map_or(-1, |head| head as i32);
            self.data.write_part(page, offset as usize, &[link])?;
            self.set_page_info(
                page,
                PageInfo::Small {
                    capacity,
                    free_head: Some(offset),
                    watermark,
                },
            )?;
        }
        self.free_pages[class].insert(page);
        Ok(())
    }

    /// Chain a new page after the last page of the large vector headed by `head`
    fn append_page(&mut self, head: PageId) -> VectorResult<PageId> {
        let info = self.page_info(head)?;
        let PageInfo::LargeHead {
            capacity,
            next,
            last,
        } = info
        else {
            return Err(corrupted(head, info));
        };

        let page = self.new_page()?;
        self.set_page_info(page, PageInfo::LargeTail { next: 0 })?;
        let next = if last == head {
            page
        } else {
            self.set_page_info(last, PageInfo::LargeTail { next: page })?;
            next
        };
        self.set_page_info(
            head,
            PageInfo::LargeHead {
                capacity: capacity + INTS_PER_PAGE as u32,
                next,
                last: page,
            },
        )?;
        Ok(page)
    }

    /// Write `data` over the chain headed by `head`, growing or truncating it
    fn rewrite_chain(&mut self, head: PageId, data: &[i32]) -> VectorResult<()> {
        let chunk_count = data.len().div_ceil(INTS_PER_PAGE);
        let mut page = head;
        for (i, chunk) in data.chunks(INTS_PER_PAGE).enumerate() {
            self.page_buffer[..chunk.len()].copy_from_slice(chunk);
            self.page_buffer[chunk.len()..].fill(0);
            self.data.write_page(page, &self.page_buffer)?;

            if i + 1 < chunk_count {
                page = match self.page_info(page)?.next() {
                    0 => self.append_page(head)?,
                    next => next,
                };
            }
        }
        self.discard_after(head, page, chunk_count as u32)
    }

    /// Cut the chain headed by `head` after `last`, which is its `kept`-th page
    fn discard_after(&mut self, head: PageId, last: PageId, kept: u32) -> VectorResult<()> {
        let mut current = self.page_info(last)?.next();
        if current == 0 {
            return Ok(());
        }

        if last == head {
            self.set_page_info(
                head,
                PageInfo::LargeHead {
                    capacity: INTS_PER_PAGE as u32,
                    next: 0,
                    last: head,
                },
            )?;
        } else {
            let next = self.page_info(head)?.next();
            self.set_page_info(last, PageInfo::LargeTail { next: 0 })?;
            self.set_page_info(
                head,
                PageInfo::LargeHead {
                    capacity: kept * INTS_PER_PAGE as u32,
                    next,
                    last,
                },
            )?;
        }

        let mut discarded = 0u32;
        while current != 0 {
            let next = self.page_info(current)?.next();
            self.delete_page(current)?;
            current = next;
            discarded += 1;
        }
        tracing::debug!(head, kept, discarded, "truncated large vector");
        Ok(())
    }
}

fn class_of(capacity: u32) -> usize {
    capacity.trailing_zeros() as usize
}

/// A page whose info does not fit the role a position or class set gave it
fn corrupted(page: PageId, info: PageInfo) -> VectorError {
    VectorError::CorruptedInfo {
        page,
        words: info.encode(),
    }
}
