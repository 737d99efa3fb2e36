//! Narrow storage interface consumed by the orchestrator.

use crate::error::Result;

/// Access to the partitioned key-value persistence store.
///
/// Implementations are the only code allowed to touch the storage backend.
pub trait DeviceListStore {
    /// Numeric id of the partition recorded under `logical_name`.
    ///
    /// A numeric name matches both its integer and its decimal-string form.
    /// Fails with `PartitionNotFound` when nothing matches.
    fn resolve_partition(&self, logical_name: &str) -> Result<i64>;

    /// Raw value stored under `(partition_id, key)`, or `MissingEntry`.
    fn load_entry(&self, partition_id: i64, key: i64) -> Result<Vec<u8>>;

    /// Replace the value under `(partition_id, key)` in a single statement.
    fn store_entry(&mut self, partition_id: i64, key: i64, blob: Vec<u8>) -> Result<()>;
}
