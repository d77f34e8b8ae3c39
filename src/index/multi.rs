use std::path::Path;

use super::error::IndexResult;
use super::extendible::ExtendibleHashIndex;
use super::HashIndexOptions;
use crate::record::RecordId;
use crate::vector::{EMPTY_VECTOR, VectorArena};

/// Maps a key to a set of record ids.
///
/// The hash index stores, per key, the position of an id vector in a
/// [`VectorArena`]. The arena is passed in on every call so one arena can back
/// many indexes. Removal is lazy: ids are never erased one by one. Readers
/// filter the stored ids against the records and write back the survivors
/// with [`rewrite`](Self::rewrite), or let [`find_live`](Self::find_live) do both.
pub struct MultiValueIndex {
    index: ExtendibleHashIndex,
}

impl MultiValueIndex {
    pub fn open<P: AsRef<Path>>(prefix: P, reset: bool, options: HashIndexOptions) -> IndexResult<Self> {
        Ok(Self {
            index: ExtendibleHashIndex::open(prefix, reset, options)?,
        })
    }

    /// Add `id` to the set of `key`
    pub fn insert<K: AsRef<[u8]>>(&mut self, arena: &mut VectorArena, key: K, id: RecordId) -> IndexResult<()> {
        debug_assert!(id != 0 && id <= i32::MAX as u32);
        let key = key.as_ref();
        let pos = self.index.at(key)?;
        let new_pos = arena.push_back(pos, id as i32)?;
        self.store(key, pos, new_pos)
    }

    /// Every id stored for `key`, in insertion order, including stale ones
    pub fn find_all<K: AsRef<[u8]>>(&mut self, arena: &mut VectorArena, key: K) -> IndexResult<Vec<RecordId>> {
        let pos = self.index.at(key)?;
        Ok(arena
            .get_data(pos)?
            .into_iter()
            .map(|id| id as RecordId)
            .collect())
    }

    /// Replace the id set of `key`. An empty set removes the key.
    pub fn rewrite<K: AsRef<[u8]>>(
        &mut self,
        arena: &mut VectorArena,
        key: K,
        ids: &[RecordId],
    ) -> IndexResult<()> {
        let key = key.as_ref();
        let pos = self.index.at(key)?;
        let words: Vec<i32> = ids.iter().map(|&id| id as i32).collect();
        let new_pos = arena.rewrite(pos, &words)?;
        self.store(key, pos, new_pos)
    }

    /// Ids of `key` for which `keep` holds, sorted and deduplicated.
    ///
    /// When anything was dropped (stale or duplicate ids), the stored set is
    /// compacted to the returned one.
    pub fn find_live<K, F>(&mut self, arena: &mut VectorArena, key: K, mut keep: F) -> IndexResult<Vec<RecordId>>
    where
        K: AsRef<[u8]>,
        F: FnMut(RecordId) -> bool,
    {
        let key = key.as_ref();
        let stored = self.find_all(arena, key)?;
        let mut live = stored.clone();
        live.sort_unstable();
        live.dedup();
        live.retain(|&id| keep(id));

        if live.len() < stored.len() {
            tracing::trace!(
                stored = stored.len(),
                live = live.len(),
                "compacting id set"
            );
            self.rewrite(arena, key, &live)?;
        }
        Ok(live)
    }

    /// Number of keys with a non-empty id set
    pub fn len(&self) -> u32 {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The underlying key -> position index
    pub fn index(&self) -> &ExtendibleHashIndex {
        &self.index
    }

    /// Flush the key index. The arena is flushed by its owner.
    pub fn flush(&mut self) -> IndexResult<()> {
        self.index.flush()
    }

    fn store(&mut self, key: &[u8], old_pos: u32, new_pos: u32) -> IndexResult<()> {
        if new_pos == old_pos {
            return Ok(());
        }
        if new_pos == EMPTY_VECTOR {
            self.index.erase(key)?;
        } else {
            self.index.insert(key, new_pos)?;
        }
        Ok(())
    }
}
