//! Human-readable report written to stdout.
//!
//! Diagnostics go through `tracing`; this is the operator-facing output with
//! the `[INFO]`/`[WARN]`/... prefixes the head-unit procedures refer to.

use std::fmt::Display;
use std::io::{self, Write};

use crate::codec::device_list::{Occurrence, Summary, NATIVE_SELECTED};
use crate::config::EXPECTED_VERSION;
use crate::error::Result;
use crate::orchestrator::{Mode, Outcome};

/// The stored header value, shown as 32 bits unless the high word is set.
pub fn stored_crc(stored: u64) -> String {
    if stored >> 32 == 0 {
        format!("{stored:#010x}")
    } else {
        format!("{stored:#018x}")
    }
}

const RULE: &str = "======================================================================";

pub struct Reporter<W: Write> {
    out: W,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn tagged(&mut self, tag: &str, msg: impl Display) -> io::Result<()> {
        writeln!(self.out, "[{tag}] {msg}")
    }

    pub fn info(&mut self, msg: impl Display) -> io::Result<()> {
        self.tagged("INFO", msg)
    }

    pub fn warn(&mut self, msg: impl Display) -> io::Result<()> {
        self.tagged("WARN", msg)
    }

    pub fn error(&mut self, msg: impl Display) -> io::Result<()> {
        self.tagged("ERROR", msg)
    }

    pub fn success(&mut self, msg: impl Display) -> io::Result<()> {
        self.tagged("SUCCESS", msg)
    }

    pub fn blank(&mut self) -> io::Result<()> {
        writeln!(self.out)
    }

    pub fn banner(&mut self, db_path: &str, mode: Mode) -> io::Result<()> {
        writeln!(self.out, "{RULE}")?;
        writeln!(self.out, "Android Auto Device State Repair Tool")?;
        writeln!(self.out, "Porsche PCM5 (MH2P) - Partition 1008 Fix")?;
        writeln!(self.out, "{RULE}")?;
        writeln!(self.out, "Database: {db_path}")?;
        writeln!(self.out, "Mode: {}", mode.label())?;
        writeln!(self.out)
    }

    /// Stored vs. calculated CRC, plus version and structure warnings.
    pub fn header(&mut self, summary: &Summary<'_>) -> io::Result<()> {
        self.info(format_args!(
            "Stored CRC32:     {}",
            stored_crc(summary.stored_checksum)
        ))?;
        self.info(format_args!(
            "Calculated CRC32: {:#010x}",
            summary.computed_checksum
        ))?;
        if summary.checksum_valid() {
            self.info("CRC32 valid")?;
        } else {
            self.warn("CRC32 mismatch detected! This blob may have been corrupted.")?;
            self.warn("System will reject this data on next boot.")?;
        }
        if summary.version != EXPECTED_VERSION {
            self.warn(format_args!(
                "Unexpected device list version {} (expected {EXPECTED_VERSION})",
                summary.version
            ))?;
        }
        if let Some(defect) = &summary.defect {
            self.error(format_args!("Device list is malformed: {defect}"))?;
            self.info(format_args!(
                "Parsed {} of {} device record(s) before the error",
                summary.devices.len(),
                summary.device_count
            ))?;
        }
        Ok(())
    }

    /// Every parsed device with its acceptance state.
    pub fn devices(&mut self, summary: &Summary<'_>) -> io::Result<()> {
        self.tagged(
            "LIST",
            format_args!(
                "Version {}, {} device(s) recorded",
                summary.version, summary.device_count
            ),
        )?;
        for device in &summary.devices {
            let marker = if device.accept_state == NATIVE_SELECTED {
                "  <- needs fixing"
            } else {
                ""
            };
            writeln!(
                self.out,
                "  #{} {} [{}] {}{marker}",
                device.index,
                device.display_name(),
                String::from_utf8_lossy(device.smartphone_type),
                device.accept_state_lossy(),
            )?;
        }
        writeln!(self.out)
    }

    pub fn occurrences(&mut self, occurrences: &[Occurrence]) -> io::Result<()> {
        self.info(format_args!(
            "Found {} device(s) with NATIVE_SELECTED state",
            occurrences.len()
        ))?;
        for occurrence in occurrences {
            writeln!(
                self.out,
                "  - Position {}: {}",
                occurrence.offset, occurrence.device_name
            )?;
        }
        writeln!(self.out)
    }

    pub fn transitions(&mut self, tag: &str, headline: &str, occurrences: &[Occurrence]) -> io::Result<()> {
        self.tagged(tag, headline)?;
        for occurrence in occurrences {
            writeln!(
                self.out,
                "  - {}: NATIVE_SELECTED -> DISCLAIMER_ACCEPTED",
                occurrence.device_name
            )?;
        }
        Ok(())
    }

    pub fn size_change(&mut self, tag: &str, old_len: usize, new_len: usize) -> io::Result<()> {
        let delta = new_len as i64 - old_len as i64;
        self.tagged(
            tag,
            format_args!("Blob size: {old_len} -> {new_len} bytes ({delta:+} bytes)"),
        )
    }

    /// Closing block with the outcome, or the error and exit status.
    pub fn footer(&mut self, mode: Mode, result: &Result<Outcome>, exit_status: u8) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "{RULE}")?;
        writeln!(self.out, "SUMMARY")?;
        writeln!(self.out, "{RULE}")?;
        match result {
            Ok(outcome) => {
                writeln!(self.out, "Issues found: {}", outcome.issues)?;
                writeln!(self.out, "Devices actually fixed: {}", outcome.fixed)?;
                writeln!(self.out, "Errors encountered: 0")?;
                if outcome.modified() {
                    writeln!(self.out)?;
                    self.info("Database has been modified.")?;
                } else if mode.mutates() {
                    writeln!(self.out)?;
                    self.info("Database was not modified.")?;
                }
            }
            Err(e) => {
                writeln!(self.out, "Error: {e}")?;
                writeln!(self.out, "Exit code: {exit_status}")?;
            }
        }
        writeln!(self.out, "{RULE}")?;
        self.out.flush()
    }
}
