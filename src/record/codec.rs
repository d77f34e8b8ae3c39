use super::error::{RecordError, RecordResult};

/// A record with a fixed binary width.
///
/// `encode` fills exactly `SIZE` bytes and `decode` reads them back. The width
/// is part of the on-disk format: changing it invalidates existing files.
pub trait FixedRecord: Sized {
    /// Encoded size in bytes
    const SIZE: usize;

    /// Write the record into `dest` (`SIZE` bytes)
    fn encode(&self, dest: &mut [u8]);

    /// Read a record from `src` (`SIZE` bytes)
    fn decode(src: &[u8]) -> RecordResult<Self>;
}

/// Write a string into a fixed-width field, NUL padded.
/// Strings longer than the field are truncated at a character boundary.
pub fn write_fixed_str(dest: &mut [u8], value: &str) {
    let mut end = value.len().min(dest.len());
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    dest[..end].copy_from_slice(&value.as_bytes()[..end]);
    dest[end..].fill(0);
}

/// Read a string written by [`write_fixed_str`], stopping at the first NUL
pub fn read_fixed_str(src: &[u8]) -> RecordResult<String> {
    let end = src.iter().position(|&b| b == 0).unwrap_or(src.len());
    String::from_utf8(src[..end].to_vec())
        .map_err(|e| RecordError::Deserialization(format!("Invalid UTF-8 in string field: {}", e)))
}

pub fn write_u32(dest: &mut [u8], value: u32) {
    dest[..4].copy_from_slice(&value.to_le_bytes());
}

pub fn read_u32(src: &[u8]) -> u32 {
    u32::from_le_bytes([src[0], src[1], src[2], src[3]])
}

pub fn write_u64(dest: &mut [u8], value: u64) {
    dest[..8].copy_from_slice(&value.to_le_bytes());
}

pub fn read_u64(src: &[u8]) -> u64 {
    u64::from_le_bytes([
        src[0], src[1], src[2], src[3], src[4], src[5], src[6], src[7],
    ])
}
