//! Bucket page layout.
//!
//! ```text
//! word 0       local depth
//! word 1       number of pairs
//! word 2..     pairs, 3 words each: hash low, hash high, value
//! ```

use ahash::AHashMap;

use crate::file::{INTS_PER_PAGE, PageId};

const HEADER_WORDS: usize = 2;
const PAIR_WORDS: usize = 3;

/// Number of (hash, value) pairs one bucket page holds
pub const PAIRS_PER_PAGE: usize = (INTS_PER_PAGE - HEADER_WORDS) / PAIR_WORDS;

/// A decoded bucket. `page == 0` means no bucket is loaded.
#[derive(Debug, Default)]
pub(crate) struct Bucket {
    pub page: PageId,
    pub local_depth: u32,
    pub pairs: AHashMap<u64, u32>,
    pub dirty: bool,
}

impl Bucket {
    pub fn new(page: PageId, local_depth: u32) -> Self {
        Self {
            page,
            local_depth,
            pairs: AHashMap::with_capacity(PAIRS_PER_PAGE),
            dirty: true,
        }
    }

    pub fn decode(page: PageId, words: &[i32]) -> Self {
        let count = (words[1] as usize).min(PAIRS_PER_PAGE);
        let mut pairs = AHashMap::with_capacity(PAIRS_PER_PAGE);
        for pair in words[HEADER_WORDS..HEADER_WORDS + count * PAIR_WORDS].chunks_exact(PAIR_WORDS) {
            let hash = (pair[0] as u32 as u64) | ((pair[1] as u32 as u64) << 32);
            pairs.insert(hash, pair[2] as u32);
        }
        Self {
            page,
            local_depth: words[0] as u32,
            pairs,
            dirty: false,
        }
    }

    pub fn encode(&self, words: &mut [i32]) {
        debug_assert!(self.pairs.len() <= PAIRS_PER_PAGE);
        words.fill(0);
        words[0] = self.local_depth as i32;
        words[1] = self.pairs.len() as i32;
        for (pair, (&hash, &value)) in words[HEADER_WORDS..]
            .chunks_exact_mut(PAIR_WORDS)
            .zip(&self.pairs)
        {
            pair[0] = hash as u32 as i32;
            pair[1] = (hash >> 32) as u32 as i32;
            pair[2] = value as i32;
        }
    }

    pub fn is_full(&self) -> bool {
        self.pairs.len() >= PAIRS_PER_PAGE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs_per_page() {
        assert_eq!(PAIRS_PER_PAGE, 340);
    }

    #[test]
    fn test_encode_decode_full_bucket() {
        let mut bucket = Bucket::new(7, 3);
        for i in 0..PAIRS_PER_PAGE as u64 {
            bucket.pairs.insert(u64::MAX - i * 0x1_0000_0001, i as u32 + 1);
        }
        assert!(bucket.is_full());

        let mut words = vec![0i32; INTS_PER_PAGE];
        bucket.encode(&mut words);
        let decoded = Bucket::decode(7, &words);

        assert_eq!(decoded.local_depth, 3);
        assert_eq!(decoded.pairs, bucket.pairs);
        assert!(!decoded.dirty);
    }

    #[test]
    fn test_zeroed_page_is_empty_bucket() {
        let words = vec![0i32; INTS_PER_PAGE];
        let bucket = Bucket::decode(1, &words);
        assert_eq!(bucket.local_depth, 0);
        assert!(bucket.pairs.is_empty());
    }
}
