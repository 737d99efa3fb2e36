//! Repair tool for the PCM5 (MH2P) partition 1008 device list.
//!
//! A firmware defect leaves paired phones with their acceptance state set to
//! `NATIVE_SELECTED` instead of `DISCLAIMER_ACCEPTED`, and the head unit then
//! refuses Android Auto for them. This crate parses the device-list blob,
//! rewrites the offending strings, reseals the CRC32 header and writes the
//! blob back through a narrow storage adapter.
//!
//! The codec and repair transform are pure functions over bytes. Storage,
//! backup and reporting are separate seams wired together by [`orchestrator`].

pub mod backup;
pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod repair;
pub mod report;
pub mod storage;

pub use backup::{Backup, FileCopyBackup};
pub use codec::{
    locate_native_selected, parse, scan_native_selected, DeviceEntry, DeviceRecord, Occurrence,
    Summary,
};
pub use config::{StorageSchema, Target, DEFAULT_DB_PATH, EXPECTED_VERSION};
pub use error::{ErrorKind, RepairError, Result};
pub use orchestrator::{exit_status, run, Mode, Outcome};
pub use repair::{apply, plan, repair, RepairPlan, Repaired};
pub use report::Reporter;
pub use storage::traits::DeviceListStore;
