pub mod sqlite;

pub use sqlite::SQLiteStorage;
