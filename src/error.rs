use thiserror::Error;

/// Coarse classification of a [`RepairError`], independent of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArguments,
    StorageUnavailable,
    PartitionNotFound,
    MissingEntry,
    StorageWriteFailed,
    Storage,
    TruncatedBlob,
    Structural,
    ChecksumMismatch,
    LocatorDisagreement,
    Overflow,
    BackupFailed,
    Output,
}

#[derive(Debug, Error)]
pub enum RepairError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Cannot open database {path}: {reason}")]
    StorageUnavailable { path: String, reason: String },

    #[error("Partition {0} not found in database")]
    PartitionNotFound(String),

    #[error("No entry for partition id {partition_id}, key {key}")]
    MissingEntry { partition_id: i64, key: i64 },

    #[error("Failed to update database: {0}")]
    StorageWriteFailed(String),

    #[error("Storage query failed: {0}")]
    Storage(String),

    #[error("Blob truncated: {needed} bytes needed at offset {offset}, blob has {len}")]
    TruncatedBlob {
        offset: usize,
        needed: usize,
        len: usize,
    },

    #[error("Malformed device list: {0}")]
    Structural(String),

    #[error("CRC32 mismatch: stored {stored:#010x}, calculated {computed:#010x}")]
    ChecksumMismatch { stored: u64, computed: u32 },

    #[error(
        "Parser and byte scan disagree on NATIVE_SELECTED offsets (parser: {parsed:?}, scan: {scanned:?})"
    )]
    LocatorDisagreement {
        parsed: Vec<usize>,
        scanned: Vec<usize>,
    },

    #[error("Repaired blob would overflow: {len} bytes + {occurrences} replacements")]
    Overflow { len: usize, occurrences: usize },

    #[error("Failed to create backup {path}: {source}")]
    BackupFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write report: {0}")]
    Output(#[from] std::io::Error),
}

impl RepairError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArguments(_) => ErrorKind::InvalidArguments,
            Self::StorageUnavailable { .. } => ErrorKind::StorageUnavailable,
            Self::PartitionNotFound(_) => ErrorKind::PartitionNotFound,
            Self::MissingEntry { .. } => ErrorKind::MissingEntry,
            Self::StorageWriteFailed(_) => ErrorKind::StorageWriteFailed,
            Self::Storage(_) => ErrorKind::Storage,
            Self::TruncatedBlob { .. } => ErrorKind::TruncatedBlob,
            Self::Structural(_) => ErrorKind::Structural,
            Self::ChecksumMismatch { .. } => ErrorKind::ChecksumMismatch,
            Self::LocatorDisagreement { .. } => ErrorKind::LocatorDisagreement,
            Self::Overflow { .. } => ErrorKind::Overflow,
            Self::BackupFailed { .. } => ErrorKind::BackupFailed,
            Self::Output(_) => ErrorKind::Output,
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for RepairError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RepairError>;
