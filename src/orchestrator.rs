//! Drives one run: load the device list, report, and (in fix mode) back up
//! and write the repaired blob.
//!
//! Ordering in fix mode is backup, then database write, then the success
//! report. Nothing is written unless every earlier step succeeded.

use std::io::Write;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::backup::Backup;
use crate::codec::device_list::parse;
use crate::config::Target;
use crate::error::{ErrorKind, RepairError, Result};
use crate::repair;
use crate::report::{stored_crc, Reporter};
use crate::storage::traits::DeviceListStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Report devices and issues, change nothing.
    List,
    /// Run the transform in memory and report what would change.
    DryRun,
    /// Repair and write back, with a file backup first unless `backup` is false.
    Fix { backup: bool },
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::List => "LIST (show corrupted devices)",
            Self::DryRun => "DRY-RUN (preview changes)",
            Self::Fix { .. } => "FIX (will modify database)",
        }
    }

    pub fn mutates(&self) -> bool {
        matches!(self, Self::Fix { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// NATIVE_SELECTED occurrences found.
    pub issues: usize,
    /// Occurrences rewritten in the database.
    pub fixed: usize,
    pub backup: Option<PathBuf>,
}

impl Outcome {
    pub fn modified(&self) -> bool {
        self.fixed > 0
    }
}

/// Process exit status for a finished run.
///
/// Success, including "nothing to fix" and "no device list", is 0. Argument
/// errors are 2, every other failure is 1.
pub fn exit_status(result: &Result<Outcome>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(e) => match e.kind() {
            ErrorKind::MissingEntry => 0,
            ErrorKind::InvalidArguments => 2,
            _ => 1,
        },
    }
}

pub fn run<S, B, W>(
    store: &mut S,
    backup: &B,
    report: &mut Reporter<W>,
    target: &Target,
    mode: Mode,
) -> Result<Outcome>
where
    S: DeviceListStore,
    B: Backup,
    W: Write,
{
    let partition_id = store.resolve_partition(&target.partition)?;
    report.info(format_args!(
        "Found partition {} with ID: {partition_id}",
        target.partition
    ))?;
    report.blank()?;

    let blob = match store.load_entry(partition_id, target.key) {
        Ok(blob) => blob,
        Err(RepairError::MissingEntry { .. }) => {
            info!(partition_id, key = target.key, "no device list entry");
            report.info(format_args!(
                "No device list found (Key {} not present)",
                target.key
            ))?;
            report.info("This is normal if no devices have been paired yet")?;
            return Ok(Outcome::default());
        }
        Err(e) => return Err(e),
    };
    report.info(format_args!(
        "Found device list (Key {}): {} bytes",
        target.key,
        blob.len()
    ))?;

    let summary = parse(&blob)?;
    report.header(&summary)?;
    if let Err(e) = summary.verify_checksum() {
        warn!(error = %e, "device list checksum mismatch");
    }
    if mode == Mode::List {
        report.blank()?;
        report.devices(&summary)?;
    }

    let occurrences = summary.occurrences();
    if occurrences.is_empty() {
        summary.ensure_well_formed()?;
        report.success("No NATIVE_SELECTED states found - all devices are OK!")?;
        return Ok(Outcome::default());
    }
    report.occurrences(&occurrences)?;

    let issues = occurrences.len();
    if mode == Mode::List {
        report.transitions("LIST", "Devices that need fixing:", &occurrences)?;
        summary.ensure_well_formed()?;
        if let Err(e) = repair::plan_parsed(&summary) {
            report.warn(format_args!("{e}"))?;
            report.warn("Repair would be refused for this device list.")?;
        }
        return Ok(Outcome {
            issues,
            ..Outcome::default()
        });
    }

    let plan = repair::plan_parsed(&summary)?;
    let repaired = repair::repair_planned(&blob, &summary, plan)?;
    let old_len = repaired.old_len;
    let new_len = repaired.new_len();

    let Mode::Fix { backup: backup_enabled } = mode else {
        report.transitions("DRY-RUN", "Would fix the following:", &repaired.occurrences)?;
        report.blank()?;
        report.size_change("DRY-RUN", old_len, new_len)?;
        report.tagged(
            "DRY-RUN",
            format_args!("New CRC32 would be: {:#010x}", repaired.new_checksum),
        )?;
        return Ok(Outcome {
            issues,
            ..Outcome::default()
        });
    };

    let backup_path = if backup_enabled {
        match backup.create() {
            Ok(path) => {
                report.blank()?;
                report.info(format_args!("Created backup: {}", path.display()))?;
                report.blank()?;
                Some(path)
            }
            Err(e) => {
                report.error(format_args!("{e}"))?;
                report.error("Aborting for safety")?;
                return Err(e);
            }
        }
    } else {
        warn!("backup disabled, writing without a copy");
        report.warn("Backup disabled (--no-backup)")?;
        None
    };

    let old_checksum = repaired.old_checksum;
    let new_checksum = repaired.new_checksum;
    store.store_entry(partition_id, target.key, repaired.blob)?;

    report.success(format_args!("Fixed {issues} device(s) in device list"))?;
    report.transitions("INFO", "Rewritten acceptance states:", &repaired.occurrences)?;
    report.blank()?;
    report.size_change("INFO", old_len, new_len)?;
    report.info(format_args!(
        "Updated CRC32: {} -> {new_checksum:#010x}",
        stored_crc(old_checksum)
    ))?;
    report.info("Database changes committed")?;
    report.info("Android Auto should now work after reconnecting affected phones")?;

    Ok(Outcome {
        issues,
        fixed: issues,
        backup: backup_path,
    })
}
