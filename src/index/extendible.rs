use std::path::Path;

use crate::file::{INTS_PER_PAGE, IntArray, PageId, PageStore, prefixed_path};

use super::bucket::Bucket;
use super::error::{IndexError, IndexResult};
use super::hash::hash_key;
use super::HashIndexOptions;

/// Bucket-store info slot holding the global depth
const GLOBAL_DEPTH_SLOT: usize = 0;

/// Bucket-store info slot holding the number of stored entries
const LEN_SLOT: usize = 1;

/// Maps a byte key to a non-zero 32-bit value with extendible hashing.
///
/// Keys are reduced to a 64-bit hash; the hash is what is stored, so two keys
/// with the same hash are the same entry. The directory (an [`IntArray`] with
/// `2^global_depth` slots) maps the low `global_depth` bits of a hash to a
/// bucket page. A bucket with local depth `d` is referenced by exactly
/// `2^(global_depth - d)` slots, all agreeing on their low `d` bits.
///
/// Files: `<prefix>_dir` (directory) and `<prefix>_bucket` (bucket pages).
/// One decoded bucket is kept in memory; it is written back when another
/// bucket is needed, on [`flush`](Self::flush), and on drop.
pub struct ExtendibleHashIndex {
    directory: IntArray,
    buckets: PageStore,
    global_depth: u32,
    len: u32,
    max_global_depth: u32,
    active: Bucket,
    /// Reusable page buffer for bucket encode/decode
    page_buffer: Vec<i32>,
}

impl ExtendibleHashIndex {
    /// Open (or create) an index. With `reset`, existing entries are discarded.
    pub fn open<P: AsRef<Path>>(prefix: P, reset: bool, options: HashIndexOptions) -> IndexResult<Self> {
        let prefix = prefix.as_ref();
        let mut directory = IntArray::open(prefixed_path(prefix, "_dir"), reset)?;
        let mut buckets = PageStore::open(prefixed_path(prefix, "_bucket"), reset)?;
        if options.cache_directory {
            directory.cache()?;
        }

        let mut page_buffer = vec![0i32; INTS_PER_PAGE];
        let (global_depth, len) = if directory.is_empty() {
            let page = buckets.new_page()?;
            Bucket::new(page, 0).encode(&mut page_buffer);
            buckets.write_page(page, &page_buffer)?;
            directory.push_back(page as i32)?;
            buckets.set_info(GLOBAL_DEPTH_SLOT, 0);
            buckets.set_info(LEN_SLOT, 0);
            (0, 0)
        } else {
            (
                buckets.info(GLOBAL_DEPTH_SLOT) as u32,
                buckets.info(LEN_SLOT) as u32,
            )
        };
        debug_assert_eq!(directory.len(), 1usize << global_depth);

        tracing::debug!(
            prefix = %prefix.display(),
            reset,
            global_depth,
            entries = len,
            "opened hash index"
        );

        Ok(Self {
            directory,
            buckets,
            global_depth,
            len,
            max_global_depth: options.max_global_depth,
            active: Bucket::default(),
            page_buffer,
        })
    }

    /// Look up a key. Returns 0 when the key is absent.
    pub fn at<K: AsRef<[u8]>>(&mut self, key: K) -> IndexResult<u32> {
        let hash = hash_key(key.as_ref());
        let slot = self.slot_of(hash);
        let page = self.directory.get(slot)? as PageId;
        self.bind(page)?;
        Ok(self.active.pairs.get(&hash).copied().unwrap_or(0))
    }

    /// Check whether a key is present
    pub fn contains<K: AsRef<[u8]>>(&mut self, key: K) -> IndexResult<bool> {
        Ok(self.at(key)? != 0)
    }

    /// Insert or overwrite a key. `value` must be non-zero.
    ///
    /// Splits the target bucket (doubling the directory first when needed)
    /// until the entry fits. Fails with [`IndexError::DirectoryOverflow`] when
    /// that would push the global depth past the configured maximum.
    pub fn insert<K: AsRef<[u8]>>(&mut self, key: K, value: u32) -> IndexResult<()> {
        debug_assert!(value != 0, "0 is reserved for absent keys");
        let hash = hash_key(key.as_ref());

        loop {
            let slot = self.slot_of(hash);
            let page = self.directory.get(slot)? as PageId;
            self.bind(page)?;

            if !self.active.is_full() || self.active.pairs.contains_key(&hash) {
                if self.active.pairs.insert(hash, value).is_none() {
                    self.set_len(self.len + 1);
                }
                self.active.dirty = true;
                return Ok(());
            }

            if self.active.local_depth == self.global_depth {
                self.expand()?;
            }
            self.split(slot)?;
        }
    }

    /// Remove a key. Returns whether it was present.
    ///
    /// A bucket left empty is merged into its sibling when both have the same
    /// local depth. Merging goes one level only and the directory never shrinks.
    pub fn erase<K: AsRef<[u8]>>(&mut self, key: K) -> IndexResult<bool> {
        let hash = hash_key(key.as_ref());
        let slot = self.slot_of(hash);
        let page = self.directory.get(slot)? as PageId;
        self.bind(page)?;

        if self.active.pairs.remove(&hash).is_none() {
            return Ok(false);
        }
        self.active.dirty = true;
        self.set_len(self.len - 1);

        let depth = self.active.local_depth;
        if self.active.pairs.is_empty() && depth > 0 {
            self.merge(slot, page, depth)?;
        }
        Ok(true)
    }

    /// Number of stored entries
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Check if the index holds no entries
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of low hash bits used by the directory
    pub fn global_depth(&self) -> u32 {
        self.global_depth
    }

    /// Number of directory slots (always `2^global_depth`)
    pub fn directory_len(&self) -> usize {
        self.directory.len()
    }

    /// Number of bucket pages ever allocated (live and recycled)
    pub fn bucket_pages(&self) -> u32 {
        self.buckets.page_count()
    }

    /// Write the loaded bucket, the bucket file and the directory to disk
    pub fn flush(&mut self) -> IndexResult<()> {
        self.evict()?;
        self.buckets.flush()?;
        self.directory.sync()?;
        Ok(())
    }

    /// Bucket page referenced by a directory slot
    #[cfg(test)]
    pub(crate) fn directory_entry(&mut self, slot: usize) -> IndexResult<PageId> {
        Ok(self.directory.get(slot)? as PageId)
    }

    /// Local depth of a bucket page
    #[cfg(test)]
    pub(crate) fn local_depth_of(&mut self, page: PageId) -> IndexResult<u32> {
        self.bind(page)?;
        Ok(self.active.local_depth)
    }

    fn slot_of(&self, hash: u64) -> usize {
        let mask = (1u64 << self.global_depth) - 1;
        (hash & mask) as usize
    }

    fn set_len(&mut self, len: u32) {
        self.len = len;
        self.buckets.set_info(LEN_SLOT, len as i32);
    }

    /// Double the directory
    fn expand(&mut self) -> IndexResult<()> {
        if self.global_depth >= self.max_global_depth {
            tracing::error!(
                max_depth = self.max_global_depth,
                "hash directory reached its maximum depth"
            );
            return Err(IndexError::DirectoryOverflow {
                max_depth: self.max_global_depth,
            });
        }

        self.directory.double_size()?;
        self.global_depth += 1;
        self.buckets
            .set_info(GLOBAL_DEPTH_SLOT, self.global_depth as i32);
        tracing::debug!(global_depth = self.global_depth, "expanded hash directory");
        Ok(())
    }

    /// Split the loaded bucket, reached through directory `slot`, on its next bit
    fn split(&mut self, slot: usize) -> IndexResult<()> {
        let old_page = self.active.page;
        let depth = self.active.local_depth;
        debug_assert!(depth < self.global_depth);
        let bit = 1u64 << depth;

        let new_page = self.buckets.new_page()?;
        let mut sibling = Bucket::new(new_page, depth + 1);
        self.active.pairs.retain(|&hash, &mut value| {
            if hash & bit != 0 {
                sibling.pairs.insert(hash, value);
                false
            } else {
                true
            }
        });
        self.active.local_depth = depth + 1;
        self.active.dirty = true;

        sibling.encode(&mut self.page_buffer);
        self.buckets.write_page(new_page, &self.page_buffer)?;

        // Slots sharing the bucket's low `depth` bits and having `bit` set move over
        let stride = 1usize << (depth + 1);
        let start = (slot & (bit as usize - 1)) | bit as usize;
        for s in (start..self.directory.len()).step_by(stride) {
            self.directory.set(s, new_page as i32)?;
        }

        tracing::debug!(
            old_page,
            new_page,
            local_depth = depth + 1,
            kept = self.active.pairs.len(),
            moved = sibling.pairs.len(),
            "split bucket"
        );
        Ok(())
    }

    /// Fold the empty bucket `page` (local depth `depth`, reached through `slot`)
    /// into its sibling
    fn merge(&mut self, slot: usize, page: PageId, depth: u32) -> IndexResult<()> {
        let sibling_slot = slot ^ (1usize << (depth - 1));
        let sibling_page = self.directory.get(sibling_slot)? as PageId;
        self.bind(sibling_page)?;
        if self.active.local_depth != depth {
            // The sibling was split further; leave the empty bucket in place
            return Ok(());
        }

        self.active.local_depth = depth - 1;
        self.active.dirty = true;

        let stride = 1usize << depth;
        for s in ((slot & (stride - 1))..self.directory.len()).step_by(stride) {
            self.directory.set(s, sibling_page as i32)?;
        }
        self.buckets.delete_page(page)?;

        tracing::debug!(
            page,
            into = sibling_page,
            local_depth = depth - 1,
            "merged empty bucket"
        );
        Ok(())
    }

    /// Make `page` the loaded bucket, writing back the previous one
    fn bind(&mut self, page: PageId) -> IndexResult<()> {
        if self.active.page == page {
            return Ok(());
        }
        self.evict()?;
        self.buckets.read_page(page, &mut self.page_buffer)?;
        self.active = Bucket::decode(page, &self.page_buffer);
        Ok(())
    }

    fn evict(&mut self) -> IndexResult<()> {
        if self.active.page != 0 && self.active.dirty {
            self.active.encode(&mut self.page_buffer);
            self.buckets.write_page(self.active.page, &self.page_buffer)?;
            self.active.dirty = false;
        }
        Ok(())
    }
}

impl Drop for ExtendibleHashIndex {
    fn drop(&mut self) {
        // Write back the loaded bucket before the page store flushes itself
        let _ = self.evict();
    }
}
