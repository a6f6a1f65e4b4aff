//! CRC32 checksums for headers, data blocks and trailers
//!
//! Every structure written to the store carries a CRC32 (IEEE polynomial)
//! over the bytes that precede it. A mismatch in the header is fatal; a
//! mismatch in the newest trailer or its blocks marks the store damaged.

use crc32fast::Hasher;

/// Computes a CRC32 checksum over the provided data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Verifies that the computed checksum matches the expected checksum.
pub fn verify_checksum(data: &[u8], expected: u32) -> bool {
    compute_checksum(data) == expected
}

/// Reads a little-endian u32 at `offset`. Caller guarantees bounds.
pub(crate) fn read_u32(data: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

/// Reads a little-endian u64 at `offset`. Caller guarantees bounds.
pub(crate) fn read_u64(data: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(buf)
}
