//! Timestamped file-copy backup taken before the database is modified.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::{info, warn};

use crate::error::{RepairError, Result};

/// Something that can preserve the database before a write.
pub trait Backup {
    /// Create the backup and return where it was written.
    fn create(&self) -> Result<PathBuf>;
}

/// `<db>.backup_YYYYMMDD_HHMMSS` for the given local time.
pub fn backup_path(db_path: &Path, at: &NaiveDateTime) -> PathBuf {
    let mut name = db_path.as_os_str().to_os_string();
    name.push(format!(".backup_{}", at.format("%Y%m%d_%H%M%S")));
    PathBuf::from(name)
}

/// Copy `src` into a new file at `target`.
///
/// An existing `target` is left untouched. A copy that fails part way is
/// removed again.
fn write_backup(src: &mut impl Read, target: &Path) -> io::Result<u64> {
    let mut dst = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)?;
    let written = io::copy(src, &mut dst).and_then(|copied| {
        dst.sync_all()?;
        Ok(copied)
    });
    if written.is_err() {
        drop(dst);
        if let Err(cleanup) = fs::remove_file(target) {
            warn!(backup = %target.display(), error = %cleanup, "partial backup left behind");
        }
    }
    written
}

/// Copies the database file next to itself.
///
/// This is a plain file copy taken while the adapter's connection is open
/// but idle. Pages still held in a `-wal` sidecar are not included, so the
/// copy is only complete for databases in rollback-journal mode, which is
/// what the head unit uses.
#[derive(Debug, Clone)]
pub struct FileCopyBackup {
    db_path: PathBuf,
}

impl FileCopyBackup {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    /// Copy to the backup path for `at`. Never overwrites an existing file.
    pub fn create_at(&self, at: &NaiveDateTime) -> Result<PathBuf> {
        let target = backup_path(&self.db_path, at);
        let failed = |source: io::Error| RepairError::BackupFailed {
            path: target.display().to_string(),
            source,
        };

        let mut src = File::open(&self.db_path).map_err(failed)?;
        let copied = write_backup(&mut src, &target).map_err(failed)?;

        info!(backup = %target.display(), bytes = copied, "database backed up");
        Ok(target)
    }
}

impl Backup for FileCopyBackup {
    fn create(&self) -> Result<PathBuf> {
        self.create_at(&Local::now().naive_local())
    }
}
