//! NATIVE_SELECTED → DISCLAIMER_ACCEPTED rewrite.
//!
//! The transform copies the blob into a new buffer, swapping each 17-byte
//! `NATIVE_SELECTED` sentinel for the 21-byte `DISCLAIMER_ACCEPTED` one, and
//! reseals the CRC32 header. Nothing else changes, so every byte after an
//! occurrence simply shifts by 4.

use tracing::{debug, warn};

use crate::codec::checksum;
use crate::codec::device_list::{
    parse, Occurrence, Summary, DISCLAIMER_ACCEPTED_SENTINEL, HEADER_SIZE,
    NATIVE_SELECTED_SENTINEL,
};
use crate::error::{RepairError, Result};

/// Bytes added per rewritten acceptance state.
pub const GROWTH_PER_OCCURRENCE: usize =
    DISCLAIMER_ACCEPTED_SENTINEL.len() - NATIVE_SELECTED_SENTINEL.len();

/// Occurrences the parser and the byte scan agree on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairPlan {
    pub occurrences: Vec<Occurrence>,
}

/// A repaired blob together with what changed.
#[derive(Debug, Clone)]
pub struct Repaired {
    pub blob: Vec<u8>,
    pub occurrences: Vec<Occurrence>,
    pub old_len: usize,
    pub old_checksum: u64,
    pub new_checksum: u32,
}

impl Repaired {
    pub fn new_len(&self) -> usize {
        self.blob.len()
    }

    pub fn size_delta(&self) -> i64 {
        self.blob.len() as i64 - self.old_len as i64
    }
}

/// Build a plan for an already parsed blob.
///
/// Refuses malformed blobs, and blobs where the sentinels found by the byte
/// scan are not exactly the acceptance states the parser found.
pub fn plan_parsed(summary: &Summary<'_>) -> Result<RepairPlan> {
    summary.ensure_well_formed()?;

    let occurrences = summary.occurrences();
    let scanned: Vec<usize> = occurrences.iter().map(|o| o.offset).collect();
    let parsed = summary.native_selected_offsets();
    if parsed != scanned {
        warn!(?parsed, ?scanned, "NATIVE_SELECTED locators disagree");
        return Err(RepairError::LocatorDisagreement { parsed, scanned });
    }

    Ok(RepairPlan { occurrences })
}

pub fn plan(blob: &[u8]) -> Result<RepairPlan> {
    plan_parsed(&parse(blob)?)
}

fn check_occurrences(blob: &[u8], occurrences: &[Occurrence]) -> Result<()> {
    let mut next_free = HEADER_SIZE;
    for occurrence in occurrences {
        let start = occurrence.offset;
        if start < next_free {
            return Err(RepairError::Structural(format!(
                "occurrence at offset {start} overlaps the header or a previous occurrence"
            )));
        }
        let end = start.saturating_add(NATIVE_SELECTED_SENTINEL.len());
        if blob.get(start..end) != Some(&NATIVE_SELECTED_SENTINEL[..]) {
            return Err(RepairError::Structural(format!(
                "no NATIVE_SELECTED sentinel at offset {start}"
            )));
        }
        next_free = end;
    }
    Ok(())
}

/// Rewrite every occurrence and reseal the header.
///
/// `occurrences` must be ascending, disjoint, past the header and each must
/// point at a `NATIVE_SELECTED` sentinel.
pub fn apply(blob: &[u8], occurrences: &[Occurrence]) -> Result<Vec<u8>> {
    if blob.len() < HEADER_SIZE {
        return Err(RepairError::TruncatedBlob {
            offset: 0,
            needed: HEADER_SIZE,
            len: blob.len(),
        });
    }
    check_occurrences(blob, occurrences)?;

    let overflow = || RepairError::Overflow {
        len: blob.len(),
        occurrences: occurrences.len(),
    };
    let new_len = occurrences
        .len()
        .checked_mul(GROWTH_PER_OCCURRENCE)
        .and_then(|growth| blob.len().checked_add(growth))
        .filter(|&len| len <= isize::MAX as usize)
        .ok_or_else(overflow)?;

    let mut out = Vec::with_capacity(new_len);
    let mut read = 0;
    for occurrence in occurrences {
        out.extend_from_slice(&blob[read..occurrence.offset]);
        out.extend_from_slice(&DISCLAIMER_ACCEPTED_SENTINEL);
        read = occurrence.offset + NATIVE_SELECTED_SENTINEL.len();
    }
    out.extend_from_slice(&blob[read..]);

    let crc = checksum::seal(&mut out)?;
    debug!(
        old_len = blob.len(),
        new_len = out.len(),
        crc = format_args!("{crc:#010x}"),
        "device list rewritten"
    );
    Ok(out)
}

/// Parse, plan and apply in one go.
pub fn repair(blob: &[u8]) -> Result<Repaired> {
    let summary = parse(blob)?;
    let plan = plan_parsed(&summary)?;
    repair_planned(blob, &summary, plan)
}

/// Apply a plan produced by [`plan_parsed`] for the same `summary`.
pub fn repair_planned(blob: &[u8], summary: &Summary<'_>, plan: RepairPlan) -> Result<Repaired> {
    let new_blob = apply(blob, &plan.occurrences)?;
    let new_checksum = checksum::payload_checksum(&new_blob)?;
    Ok(Repaired {
        blob: new_blob,
        occurrences: plan.occurrences,
        old_len: blob.len(),
        old_checksum: summary.stored_checksum,
        new_checksum,
    })
}
