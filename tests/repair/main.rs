//! Integration tests for the device-list codec and the repair transform.

mod properties;
mod scenarios;

use pcm5_pairing_repair::codec::{crc32, encode, DeviceRecord};

// ============================================================================
// Helpers
// ============================================================================

pub const NATIVE: &str = "NATIVE_SELECTED";
pub const ACCEPTED: &str = "DISCLAIMER_ACCEPTED";

pub fn phone(name: &str, state: &str) -> DeviceRecord {
    DeviceRecord::new(format!("{name}-0001"), state).with_name(name)
}

pub fn blob_of(records: &[DeviceRecord]) -> Vec<u8> {
    encode(3, records).expect("encode device list")
}

pub fn stored_crc(blob: &[u8]) -> u64 {
    u64::from_be_bytes(blob[..8].try_into().unwrap())
}

pub fn assert_sealed(blob: &[u8]) {
    assert_eq!(stored_crc(blob), u64::from(crc32(&blob[8..])));
}
