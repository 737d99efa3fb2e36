//! Big-endian integer and length-prefixed string primitives.
//!
//! Readers borrow from the input and never allocate. Any read that would run
//! past the end of the buffer fails with [`RepairError::TruncatedBlob`].

use crate::error::{RepairError, Result};

/// Size of the big-endian u16 length prefix in front of every string.
pub const STR_PREFIX_SIZE: usize = 2;

fn take(buf: &[u8], offset: usize, n: usize) -> Result<&[u8]> {
    offset
        .checked_add(n)
        .filter(|&end| end <= buf.len())
        .map(|end| &buf[offset..end])
        .ok_or(RepairError::TruncatedBlob {
            offset,
            needed: n,
            len: buf.len(),
        })
}

pub fn read_u8(buf: &[u8], offset: usize) -> Result<u8> {
    Ok(take(buf, offset, 1)?[0])
}

pub fn read_u16_be(buf: &[u8], offset: usize) -> Result<u16> {
    let b = take(buf, offset, 2)?;
    Ok(u16::from_be_bytes([b[0], b[1]]))
}

pub fn read_u32_be(buf: &[u8], offset: usize) -> Result<u32> {
    let b = take(buf, offset, 4)?;
    Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

pub fn read_i32_be(buf: &[u8], offset: usize) -> Result<i32> {
    let b = take(buf, offset, 4)?;
    Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

pub fn read_u64_be(buf: &[u8], offset: usize) -> Result<u64> {
    let b = take(buf, offset, 8)?;
    Ok(u64::from_be_bytes([
        b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
    ]))
}

/// Overwrite 8 bytes at `offset` with `value` in big-endian order.
pub fn write_u64_be(buf: &mut [u8], offset: usize, value: u64) -> Result<()> {
    let len = buf.len();
    let end = offset
        .checked_add(8)
        .filter(|&end| end <= len)
        .ok_or(RepairError::TruncatedBlob {
            offset,
            needed: 8,
            len,
        })?;
    buf[offset..end].copy_from_slice(&value.to_be_bytes());
    Ok(())
}

/// Read a length-prefixed string.
///
/// Returns the string bytes and the offset just past them. The bytes are
/// returned as stored; UTF-8 is not validated.
pub fn read_str(buf: &[u8], offset: usize) -> Result<(&[u8], usize)> {
    let len = read_u16_be(buf, offset)? as usize;
    let start = offset + STR_PREFIX_SIZE;
    let bytes = take(buf, start, len)?;
    Ok((bytes, start + len))
}

pub fn put_u16_be(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn put_i32_be(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Append a length-prefixed string.
///
/// Fails with [`RepairError::Overflow`] when `bytes` does not fit a u16 prefix.
pub fn put_str(out: &mut Vec<u8>, bytes: &[u8]) -> Result<()> {
    let len = u16::try_from(bytes.len()).map_err(|_| RepairError::Overflow {
        len: bytes.len(),
        occurrences: 0,
    })?;
    put_u16_be(out, len);
    out.extend_from_slice(bytes);
    Ok(())
}
