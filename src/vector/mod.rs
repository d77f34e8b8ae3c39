//! Variable-length vectors of non-zero integers packed into one page file.

mod arena;
mod error;
mod page_info;
#[cfg(test)]
mod tests;

pub use arena::{ArenaStats, CAPACITY_CLASSES, VectorArena};
pub use error::{VectorError, VectorResult};

/// Position of a vector: `page * INTS_PER_PAGE + offset`
pub type VectorPos = u32;

/// Position of the empty vector
pub const EMPTY_VECTOR: VectorPos = 0;
