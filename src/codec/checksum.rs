//! CRC32 header of the device-list blob.
//!
//! The first 8 bytes hold a big-endian u64 whose low 32 bits are the zlib
//! CRC32 of everything after the header. The high 32 bits are always zero.

use crate::codec::bytes::{read_u64_be, write_u64_be};
use crate::error::{RepairError, Result};

/// Size of the checksum field at the start of the blob.
pub const CHECKSUM_SIZE: usize = 8;

/// CRC32 (IEEE 802.3, reflected `0xEDB88320`), identical to zlib's `crc32`.
pub fn crc32(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}

/// The raw 64-bit value stored in the header.
pub fn stored_checksum(blob: &[u8]) -> Result<u64> {
    read_u64_be(blob, 0)
}

/// CRC32 of the payload following the header.
pub fn payload_checksum(blob: &[u8]) -> Result<u32> {
    let payload = blob.get(CHECKSUM_SIZE..).ok_or(RepairError::TruncatedBlob {
        offset: 0,
        needed: CHECKSUM_SIZE,
        len: blob.len(),
    })?;
    Ok(crc32(payload))
}

/// Recompute the payload CRC32 and write it into the header. Returns the new CRC.
pub fn seal(buf: &mut [u8]) -> Result<u32> {
    let crc = payload_checksum(buf)?;
    write_u64_be(buf, 0, u64::from(crc))?;
    Ok(crc)
}
