//! SQLite adapter over the head unit's persistence database.
//!
//! Two tables matter: a partitions catalog mapping numeric ids to names, and a
//! key-value table keyed by `(partition, key)` with a blob `value`. Table and
//! column identifiers come from [`StorageSchema`].

use std::path::Path;

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use tracing::{debug, info};

use crate::config::{quote_identifier, StorageSchema};
use crate::error::{RepairError, Result};

use super::traits::DeviceListStore;

pub struct SqliteStore {
    conn: Connection,
    schema: StorageSchema,
}

impl SqliteStore {
    /// Open an existing database read/write. Never creates a file.
    pub fn open(path: impl AsRef<Path>, schema: StorageSchema) -> Result<Self> {
        let path = path.as_ref();
        let unavailable = |reason: String| RepairError::StorageUnavailable {
            path: path.display().to_string(),
            reason,
        };

        if !path.is_file() {
            return Err(unavailable("no such file".to_string()));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| unavailable(e.to_string()))?;

        // SQLite opens lazily; touch the schema so a non-database file fails here.
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(|e| unavailable(e.to_string()))?;

        debug!(path = %path.display(), "opened persistence database");
        Ok(Self::with_connection(conn, schema))
    }

    /// Wrap an already open connection.
    pub fn with_connection(conn: Connection, schema: StorageSchema) -> Self {
        Self { conn, schema }
    }

    fn select_partition_sql(&self, by_integer: bool) -> String {
        let s = &self.schema;
        let name = quote_identifier(&s.partition_name_column);
        let filter = if by_integer {
            format!("{name} = ?1 OR {name} = ?2")
        } else {
            format!("{name} = ?1")
        };
        format!(
            "SELECT {} FROM {} WHERE {filter} ORDER BY {} LIMIT 1",
            quote_identifier(&s.partition_id_column),
            quote_identifier(&s.partitions_table),
            quote_identifier(&s.partition_id_column),
        )
    }

    /// `partition = ?n AND key = ?n+1`.
    fn entry_filter(&self, first_param: usize) -> String {
        format!(
            "{} = ?{} AND {} = ?{}",
            quote_identifier(&self.schema.data_partition_column),
            first_param,
            quote_identifier(&self.schema.data_key_column),
            first_param + 1,
        )
    }

    fn select_entry_sql(&self) -> String {
        format!(
            "SELECT {} FROM {} WHERE {}",
            quote_identifier(&self.schema.data_value_column),
            quote_identifier(&self.schema.data_table),
            self.entry_filter(1),
        )
    }

    fn update_entry_sql(&self) -> String {
        format!(
            "UPDATE {} SET {} = ?1 WHERE {}",
            quote_identifier(&self.schema.data_table),
            quote_identifier(&self.schema.data_value_column),
            self.entry_filter(2),
        )
    }
}

impl DeviceListStore for SqliteStore {
    fn resolve_partition(&self, logical_name: &str) -> Result<i64> {
        let numeric = logical_name.trim().parse::<i64>().ok();
        let sql = self.select_partition_sql(numeric.is_some());
        let mut stmt = self.conn.prepare(&sql)?;
        let id = match numeric {
            Some(n) => stmt
                .query_row(params![logical_name, n], |row| row.get::<_, i64>(0))
                .optional()?,
            None => stmt
                .query_row(params![logical_name], |row| row.get::<_, i64>(0))
                .optional()?,
        };
        let id = id.ok_or_else(|| RepairError::PartitionNotFound(logical_name.to_string()))?;
        debug!(partition = logical_name, id, "resolved partition");
        Ok(id)
    }

    fn load_entry(&self, partition_id: i64, key: i64) -> Result<Vec<u8>> {
        let sql = self.select_entry_sql();
        let value = self
            .conn
            .query_row(&sql, params![partition_id, key], |row| {
                row.get::<_, Option<Vec<u8>>>(0)
            })
            .optional()?;
        match value {
            Some(Some(blob)) => {
                debug!(partition_id, key, len = blob.len(), "loaded entry");
                Ok(blob)
            }
            Some(None) | None => Err(RepairError::MissingEntry { partition_id, key }),
        }
    }

    fn store_entry(&mut self, partition_id: i64, key: i64, blob: Vec<u8>) -> Result<()> {
        let sql = self.update_entry_sql();
        let len = blob.len();
        let changed = self
            .conn
            .execute(&sql, params![blob, partition_id, key])
            .map_err(|e| RepairError::StorageWriteFailed(e.to_string()))?;
        if changed == 0 {
            return Err(RepairError::StorageWriteFailed(format!(
                "no row for partition id {partition_id}, key {key}"
            )));
        }
        info!(partition_id, key, len, "device list written back");
        Ok(())
    }
}
