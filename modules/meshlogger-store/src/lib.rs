pub mod memory;
pub mod source;
pub mod sqlite;

pub use memory::MemorySnapshotSource;
pub use source::SnapshotSource;
pub use sqlite::SqliteSnapshotStore;
