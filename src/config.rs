//! Fixed locations and schema identifiers of the PCM5 persistence database.

/// Where the head unit keeps its persistence database.
pub const DEFAULT_DB_PATH: &str = "/mnt/persist_new/persistence/persistence.sqlite";

/// Device-list schema version written by current firmware.
pub const EXPECTED_VERSION: i32 = 3;

/// The row holding the device list: a logical partition name plus a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub partition: String,
    pub key: i64,
}

impl Default for Target {
    fn default() -> Self {
        Self {
            partition: "1008".to_string(),
            key: 1,
        }
    }
}

/// Table and column identifiers used by the SQLite adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSchema {
    pub partitions_table: String,
    pub partition_id_column: String,
    pub partition_name_column: String,
    pub data_table: String,
    pub data_partition_column: String,
    pub data_key_column: String,
    pub data_value_column: String,
}

impl Default for StorageSchema {
    fn default() -> Self {
        Self {
            partitions_table: "persistence-partitions".to_string(),
            partition_id_column: "id".to_string(),
            partition_name_column: "name".to_string(),
            data_table: "persistence-data".to_string(),
            data_partition_column: "partition".to_string(),
            data_key_column: "key".to_string(),
            data_value_column: "value".to_string(),
        }
    }
}

/// Quote an SQL identifier, doubling any embedded quotes.
///
/// The persistence tables contain dashes, so every identifier is quoted.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
