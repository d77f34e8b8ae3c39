//! Per-page bookkeeping of the arena, three words per data page.
//!
//! ```text
//!              word 0      word 1         word 2
//! unused       0           0              0
//! small        capacity    free head/-1   watermark
//! large head   capacity    next page      last page
//! large tail   -1          next page      -1
//! ```

use super::error::{VectorError, VectorResult};
use crate::file::{INTS_PER_PAGE, PageId};

/// Words of page info stored per data page
pub(crate) const INFO_WORDS: usize = 3;

const TAIL_MARKER: i32 = -1;
const NO_FREE_CELL: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PageInfo {
    /// Free page (or never used)
    Unused,
    /// Page shared by small vectors of one capacity class
    Small {
        capacity: u32,
        /// Offset of the first freed cell; freed cells are chained through their first word
        free_head: Option<u32>,
        /// Cells at or beyond this offset have never been handed out
        watermark: u32,
    },
    /// First page of a large vector. `capacity` covers the whole chain.
    LargeHead {
        capacity: u32,
        next: PageId,
        last: PageId,
    },
    /// Any later page of a large vector
    LargeTail { next: PageId },
}

impl PageInfo {
    pub fn decode(page: PageId, words: [i32; INFO_WORDS]) -> VectorResult<Self> {
        let [capacity, second, third] = words;
        let info = match capacity {
            0 => PageInfo::Unused,
            TAIL_MARKER => PageInfo::LargeTail {
                next: second as PageId,
            },
            c if c > 0 && (c as usize) < INTS_PER_PAGE && (c as u32).is_power_of_two() => {
                PageInfo::Small {
                    capacity: c as u32,
                    free_head: (second != NO_FREE_CELL).then_some(second as u32),
                    watermark: third as u32,
                }
            }
            c if c > 0 && c as usize % INTS_PER_PAGE == 0 => PageInfo::LargeHead {
                capacity: c as u32,
                next: second as PageId,
                last: third as PageId,
            },
            _ => return Err(VectorError::CorruptedInfo { page, words }),
        };
        Ok(info)
    }

    pub fn encode(&self) -> [i32; INFO_WORDS] {
        match *self {
            PageInfo::Unused => [0, 0, 0],
            PageInfo::Small {
                capacity,
                free_head,
                watermark,
            } => [
                capacity as i32,
                free_head.map_or(NO_FREE_CELL, |head| head as i32),
                watermark as i32,
            ],
            PageInfo::LargeHead {
                capacity,
                next,
                last,
            } => [capacity as i32, next as i32, last as i32],
            PageInfo::LargeTail { next } => [TAIL_MARKER, next as i32, TAIL_MARKER],
        }
    }

    /// Next page of a large vector chain (0 at the end, and for non-chain pages)
    pub fn next(&self) -> PageId {
        match *self {
            PageInfo::LargeHead { next, .. } | PageInfo::LargeTail { next } => next,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let infos = [
            PageInfo::Unused,
            PageInfo::Small {
                capacity: 8,
                free_head: None,
                watermark: 64,
            },
            PageInfo::Small {
                capacity: 512,
                free_head: Some(0),
                watermark: 1024,
            },
            PageInfo::LargeHead {
                capacity: 3072,
                next: 4,
                last: 9,
            },
            PageInfo::LargeTail { next: 0 },
        ];
        for info in infos {
            assert_eq!(PageInfo::decode(1, info.encode()).unwrap(), info);
        }
    }

    #[test]
    fn test_free_head_sentinel() {
        let words = PageInfo::Small {
            capacity: 4,
            free_head: None,
            watermark: 12,
        }
        .encode();
        assert_eq!(words, [4, -1, 12]);
    }

    #[test]
    fn test_invalid_capacity_rejected() {
        for words in [[3, 0, 0], [1500, 0, 0], [-7, 0, 0]] {
            assert!(matches!(
                PageInfo::decode(2, words),
                Err(VectorError::CorruptedInfo { page: 2, .. })
            ));
        }
    }
}
