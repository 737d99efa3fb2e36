pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

pub use memory::{MemoryStore, PartitionName};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
pub use traits::DeviceListStore;
