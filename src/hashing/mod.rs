//! BLAKE3 helpers for deriving stable, filesystem-safe names.

/// Computes a 64-bit hash of `data` using BLAKE3, truncated from 256 bits.
///
/// Used for naming, not integrity.
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[0..8]);
    u64::from_le_bytes(bytes)
}

/// File stem for a snapshot segment: 16 lowercase hex digits.
#[inline]
pub fn segment_file_stem(segment: &str) -> String {
    format!("{:016x}", hash_to_u64(segment.as_bytes()))
}
