//! Key hashing for the extendible hash index.

/// One round of splitmix64
pub fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

/// Hash a key: one round per little-endian 8-byte word, then one per tail byte
pub fn hash_key(key: &[u8]) -> u64 {
    let mut hash = 0u64;
    let mut words = key.chunks_exact(8);
    for chunk in &mut words {
        let mut word = [0u8; 8];
        word.copy_from_slice(chunk);
        hash = splitmix64(hash ^ u64::from_le_bytes(word));
    }
    for &byte in words.remainder() {
        hash = splitmix64(hash ^ byte as u64);
    }
    hash
}
