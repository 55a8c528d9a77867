//! Record store implementations for the durable tier

pub mod filesystem;
pub mod sqlite;

pub use filesystem::FsRecordStore;
pub use sqlite::SqliteRecordStore;
