//! Fixed-size record storage.
//!
//! Records are opaque fixed-width byte blobs identified by a 1-based id.
//! A record type describes its own layout through [`FixedRecord`].

mod codec;
mod error;
mod fixed_list;

pub use codec::{FixedRecord, read_fixed_str, read_u32, read_u64, write_fixed_str, write_u32, write_u64};
pub use error::{RecordError, RecordResult};
pub use fixed_list::FixedRecordList;

/// Identifier of a record in a [`FixedRecordList`] (1-based, 0 = none)
pub type RecordId = u32;
