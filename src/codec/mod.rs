pub mod bytes;
pub mod checksum;
pub mod device_list;

pub use checksum::crc32;
pub use device_list::{
    encode, locate_native_selected, parse, scan_native_selected, DeviceEntry, DeviceRecord,
    Occurrence, StructuralDefect, Summary, DISCLAIMER_ACCEPTED, DISCLAIMER_ACCEPTED_SENTINEL,
    HEADER_SIZE, NATIVE_SELECTED, NATIVE_SELECTED_SENTINEL, UNKNOWN_NAME,
};
