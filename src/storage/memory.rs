//! In-memory [`DeviceListStore`] for tests and dry runs without a database.

use std::collections::HashMap;

use crate::error::{RepairError, Result};

use super::traits::DeviceListStore;

/// A partition name as recorded in the catalog: either an integer or text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionName {
    Integer(i64),
    Text(String),
}

impl PartitionName {
    fn matches(&self, logical_name: &str) -> bool {
        match self {
            Self::Integer(n) => logical_name.trim().parse::<i64>().ok() == Some(*n),
            Self::Text(s) => s == logical_name,
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    partitions: Vec<(i64, PartitionName)>,
    entries: HashMap<(i64, i64), Vec<u8>>,
    writes: usize,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_partition(mut self, id: i64, name: PartitionName) -> Self {
        self.partitions.push((id, name));
        self
    }

    pub fn with_entry(mut self, partition_id: i64, key: i64, value: Vec<u8>) -> Self {
        self.entries.insert((partition_id, key), value);
        self
    }

    /// Make every subsequent `store_entry` fail.
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn entry(&self, partition_id: i64, key: i64) -> Option<&[u8]> {
        self.entries.get(&(partition_id, key)).map(Vec::as_slice)
    }

    /// Number of successful `store_entry` calls.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl DeviceListStore for MemoryStore {
    fn resolve_partition(&self, logical_name: &str) -> Result<i64> {
        self.partitions
            .iter()
            .filter(|(_, name)| name.matches(logical_name))
            .map(|(id, _)| *id)
            .min()
            .ok_or_else(|| RepairError::PartitionNotFound(logical_name.to_string()))
    }

    fn load_entry(&self, partition_id: i64, key: i64) -> Result<Vec<u8>> {
        self.entries
            .get(&(partition_id, key))
            .cloned()
            .ok_or(RepairError::MissingEntry { partition_id, key })
    }

    fn store_entry(&mut self, partition_id: i64, key: i64, blob: Vec<u8>) -> Result<()> {
        if self.fail_writes {
            return Err(RepairError::StorageWriteFailed("writes disabled".to_string()));
        }
        let slot = self.entries.get_mut(&(partition_id, key)).ok_or_else(|| {
            RepairError::StorageWriteFailed(format!(
                "no row for partition id {partition_id}, key {key}"
            ))
        })?;
        *slot = blob;
        self.writes += 1;
        Ok(())
    }
}
