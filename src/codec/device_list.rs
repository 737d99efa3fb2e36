//! Device-list blob: header, device records, and the NATIVE_SELECTED locator.
//!
//! Layout: `[8: CRC32 as BE u64][4: BE i32 version][4: BE i32 count][records]`.
//! Each record is
//! `uniqueId, smartphoneType, hasName(u8), [name], userAcceptState,
//! wasDisclaimerPreviouslyAccepted(u8), storeUserAcceptState(u8),
//! lastMode(BE i32), lastConnectionType`, with every string prefixed by a
//! BE u16 length.
//!
//! The parser only goes deep enough to find each device's acceptance state
//! and its display name. It never backtracks, and when a record is malformed
//! it keeps everything parsed before it so the caller can still report.

use std::borrow::Cow;
use std::fmt;

use tracing::debug;

use crate::codec::bytes::{put_i32_be, put_str, read_i32_be, read_str, read_u8};
use crate::codec::checksum::{self, CHECKSUM_SIZE};
use crate::error::{RepairError, Result};

/// Checksum, version and device count.
pub const HEADER_SIZE: usize = 16;

const VERSION_OFFSET: usize = CHECKSUM_SIZE;
const COUNT_OFFSET: usize = 12;

/// `wasDisclaimerPreviouslyAccepted` + `storeUserAcceptState` + `lastMode`.
const FIXED_TAIL_SIZE: usize = 1 + 1 + 4;

pub const NATIVE_SELECTED: &[u8] = b"NATIVE_SELECTED";
pub const DISCLAIMER_ACCEPTED: &[u8] = b"DISCLAIMER_ACCEPTED";

/// `NATIVE_SELECTED` with its length prefix, exactly as stored.
pub const NATIVE_SELECTED_SENTINEL: [u8; 17] = [
    0x00, 0x0f, b'N', b'A', b'T', b'I', b'V', b'E', b'_', b'S', b'E', b'L', b'E', b'C', b'T', b'E',
    b'D',
];

/// `DISCLAIMER_ACCEPTED` with its length prefix, exactly as stored.
pub const DISCLAIMER_ACCEPTED_SENTINEL: [u8; 21] = [
    0x00, 0x13, b'D', b'I', b'S', b'C', b'L', b'A', b'I', b'M', b'E', b'R', b'_', b'A', b'C', b'C',
    b'E', b'P', b'T', b'E', b'D',
];

/// Display name for devices without a stored name, and for occurrences no
/// parsed device claims.
pub const UNKNOWN_NAME: &str = "unknown";

// ============================================================================
// Parsed view
// ============================================================================

/// One parsed device record, borrowing from the blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry<'a> {
    pub index: usize,
    /// Offset of the first byte of the record.
    pub offset: usize,
    pub unique_id: &'a [u8],
    pub smartphone_type: &'a [u8],
    pub name: Option<&'a [u8]>,
    /// Offset of the length prefix of `userAcceptState`.
    pub accept_state_offset: usize,
    pub accept_state: &'a [u8],
    /// Offset just past the record.
    pub end: usize,
}

impl<'a> DeviceEntry<'a> {
    /// Name for reports: lossily decoded, or `"unknown"` when absent.
    pub fn display_name(&self) -> Cow<'a, str> {
        match self.name {
            Some(name) => String::from_utf8_lossy(name),
            None => Cow::Borrowed(UNKNOWN_NAME),
        }
    }

    pub fn accept_state_lossy(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.accept_state)
    }

    pub fn is_native_selected(&self) -> bool {
        self.accept_state == NATIVE_SELECTED
    }
}

/// Where and why parsing stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralDefect {
    /// Device being parsed, or `None` for header and trailer problems.
    pub device_index: Option<usize>,
    pub field: &'static str,
    pub offset: usize,
    pub detail: String,
}

impl fmt::Display for StructuralDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.device_index {
            Some(index) => write!(
                f,
                "device #{index}, field {} at offset {}: {}",
                self.field, self.offset, self.detail
            ),
            None => write!(f, "{} at offset {}: {}", self.field, self.offset, self.detail),
        }
    }
}

/// Header values plus every device record the parser got through.
#[derive(Debug, Clone)]
pub struct Summary<'a> {
    blob: &'a [u8],
    pub version: i32,
    pub device_count: i32,
    pub stored_checksum: u64,
    pub computed_checksum: u32,
    pub devices: Vec<DeviceEntry<'a>>,
    pub defect: Option<StructuralDefect>,
}

/// A `NATIVE_SELECTED` sentinel found by the byte scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    /// Offset of the sentinel's length prefix.
    pub offset: usize,
    pub device_name: String,
}

impl<'a> Summary<'a> {
    pub fn checksum_valid(&self) -> bool {
        self.stored_checksum == u64::from(self.computed_checksum)
    }

    pub fn verify_checksum(&self) -> Result<()> {
        if self.checksum_valid() {
            return Ok(());
        }
        Err(RepairError::ChecksumMismatch {
            stored: self.stored_checksum,
            computed: self.computed_checksum,
        })
    }

    /// Fail with [`RepairError::Structural`] if parsing did not reach the end cleanly.
    pub fn ensure_well_formed(&self) -> Result<()> {
        match &self.defect {
            Some(defect) => Err(RepairError::Structural(defect.to_string())),
            None => Ok(()),
        }
    }

    /// Accept-state offsets of parsed devices holding `NATIVE_SELECTED`.
    pub fn native_selected_offsets(&self) -> Vec<usize> {
        self.devices
            .iter()
            .filter(|device| device.is_native_selected())
            .map(|device| device.accept_state_offset)
            .collect()
    }

    /// Name of the device whose acceptance state starts at `offset`.
    pub fn name_at(&self, offset: usize) -> Option<Cow<'a, str>> {
        self.devices
            .iter()
            .find(|device| device.accept_state_offset == offset)
            .map(DeviceEntry::display_name)
    }

    /// Byte-scan occurrences, each named after the parsed device that owns it.
    pub fn occurrences(&self) -> Vec<Occurrence> {
        scan_native_selected(self.blob)
            .into_iter()
            .map(|offset| Occurrence {
                offset,
                device_name: self
                    .name_at(offset)
                    .map(Cow::into_owned)
                    .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            })
            .collect()
    }
}

// ============================================================================
// Parsing
// ============================================================================

struct Cursor<'a> {
    blob: &'a [u8],
    pos: usize,
    device: usize,
}

impl<'a> Cursor<'a> {
    fn defect(&self, field: &'static str, err: RepairError) -> StructuralDefect {
        StructuralDefect {
            device_index: Some(self.device),
            field,
            offset: self.pos,
            detail: err.to_string(),
        }
    }

    fn string(&mut self, field: &'static str) -> std::result::Result<&'a [u8], StructuralDefect> {
        let (bytes, next) = read_str(self.blob, self.pos).map_err(|e| self.defect(field, e))?;
        self.pos = next;
        Ok(bytes)
    }

    fn flag(&mut self, field: &'static str) -> std::result::Result<bool, StructuralDefect> {
        let b = read_u8(self.blob, self.pos).map_err(|e| self.defect(field, e))?;
        self.pos += 1;
        Ok(b != 0)
    }

    fn skip(&mut self, field: &'static str, n: usize) -> std::result::Result<(), StructuralDefect> {
        let end = self.pos + n;
        if end > self.blob.len() {
            let err = RepairError::TruncatedBlob {
                offset: self.pos,
                needed: n,
                len: self.blob.len(),
            };
            return Err(self.defect(field, err));
        }
        self.pos = end;
        Ok(())
    }

    fn record(&mut self) -> std::result::Result<DeviceEntry<'a>, StructuralDefect> {
        let offset = self.pos;
        let unique_id = self.string("deviceUniqueId")?;
        let smartphone_type = self.string("smartphoneType")?;
        let name = if self.flag("hasName")? {
            Some(self.string("name")?)
        } else {
            None
        };
        let accept_state_offset = self.pos;
        let accept_state = self.string("userAcceptState")?;
        self.skip(
            "wasDisclaimerPreviouslyAccepted/storeUserAcceptState/lastMode",
            FIXED_TAIL_SIZE,
        )?;
        self.string("lastConnectionType")?;
        Ok(DeviceEntry {
            index: self.device,
            offset,
            unique_id,
            smartphone_type,
            name,
            accept_state_offset,
            accept_state,
            end: self.pos,
        })
    }
}

/// Parse the device-list blob.
///
/// Only a blob too short to hold the header is an error. Any later problem is
/// recorded in [`Summary::defect`] with the devices parsed so far.
pub fn parse(blob: &[u8]) -> Result<Summary<'_>> {
    if blob.len() < HEADER_SIZE {
        return Err(RepairError::TruncatedBlob {
            offset: 0,
            needed: HEADER_SIZE,
            len: blob.len(),
        });
    }

    let stored_checksum = checksum::stored_checksum(blob)?;
    let computed_checksum = checksum::payload_checksum(blob)?;
    let version = read_i32_be(blob, VERSION_OFFSET)?;
    let device_count = read_i32_be(blob, COUNT_OFFSET)?;

    let mut summary = Summary {
        blob,
        version,
        device_count,
        stored_checksum,
        computed_checksum,
        devices: Vec::new(),
        defect: None,
    };

    if device_count < 0 {
        summary.defect = Some(StructuralDefect {
            device_index: None,
            field: "device count",
            offset: COUNT_OFFSET,
            detail: format!("negative device count {device_count}"),
        });
        return Ok(summary);
    }

    let mut cursor = Cursor {
        blob,
        pos: HEADER_SIZE,
        device: 0,
    };
    for index in 0..device_count as usize {
        cursor.device = index;
        match cursor.record() {
            Ok(entry) => summary.devices.push(entry),
            Err(defect) => {
                debug!(%defect, parsed = summary.devices.len(), "device list parse stopped");
                summary.defect = Some(defect);
                return Ok(summary);
            }
        }
    }

    if cursor.pos != blob.len() {
        summary.defect = Some(StructuralDefect {
            device_index: None,
            field: "trailer",
            offset: cursor.pos,
            detail: format!(
                "{} unexpected bytes after the last device record",
                blob.len() - cursor.pos
            ),
        });
    }

    Ok(summary)
}

/// Offsets of every `NATIVE_SELECTED` sentinel at or after the header.
pub fn scan_native_selected(blob: &[u8]) -> Vec<usize> {
    let Some(records) = blob.get(HEADER_SIZE..) else {
        return Vec::new();
    };
    records
        .windows(NATIVE_SELECTED_SENTINEL.len())
        .enumerate()
        .filter(|(_, window)| **window == NATIVE_SELECTED_SENTINEL[..])
        .map(|(i, _)| HEADER_SIZE + i)
        .collect()
}

/// Byte-scan the blob for `NATIVE_SELECTED` and name each occurrence.
pub fn locate_native_selected(blob: &[u8]) -> Result<Vec<Occurrence>> {
    Ok(parse(blob)?.occurrences())
}

// ============================================================================
// Encoding
// ============================================================================

/// An owned device record, for building blobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub unique_id: Vec<u8>,
    pub smartphone_type: Vec<u8>,
    pub name: Option<Vec<u8>>,
    pub accept_state: Vec<u8>,
    pub was_disclaimer_previously_accepted: bool,
    pub store_user_accept_state: bool,
    pub last_mode: i32,
    pub last_connection_type: Vec<u8>,
}

impl DeviceRecord {
    pub fn new(unique_id: impl Into<Vec<u8>>, accept_state: impl Into<Vec<u8>>) -> Self {
        Self {
            unique_id: unique_id.into(),
            smartphone_type: b"ANDROID".to_vec(),
            name: None,
            accept_state: accept_state.into(),
            was_disclaimer_previously_accepted: true,
            store_user_accept_state: true,
            last_mode: 0,
            last_connection_type: b"USB".to_vec(),
        }
    }

    pub fn with_name(mut self, name: impl Into<Vec<u8>>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        put_str(out, &self.unique_id)?;
        put_str(out, &self.smartphone_type)?;
        match &self.name {
            Some(name) => {
                out.push(1);
                put_str(out, name)?;
            }
            None => out.push(0),
        }
        put_str(out, &self.accept_state)?;
        out.push(u8::from(self.was_disclaimer_previously_accepted));
        out.push(u8::from(self.store_user_accept_state));
        put_i32_be(out, self.last_mode);
        put_str(out, &self.last_connection_type)
    }
}

/// Build a sealed device-list blob.
pub fn encode(version: i32, records: &[DeviceRecord]) -> Result<Vec<u8>> {
    let count = i32::try_from(records.len()).map_err(|_| RepairError::Overflow {
        len: records.len(),
        occurrences: 0,
    })?;
    let mut out = vec![0u8; CHECKSUM_SIZE];
    put_i32_be(&mut out, version);
    put_i32_be(&mut out, count);
    for record in records {
        record.write(&mut out)?;
    }
    checksum::seal(&mut out)?;
    Ok(out)
}
