//! Key-value store adapter contracts and implementations.
//!
//! # Responsibility
//! - Define the synchronous string key-value contract the persistence
//!   service writes through.
//! - Provide a durable SQLite backend and an in-memory backend.
//!
//! # Invariants
//! - All calls are synchronous; a returned `Ok` means the write is visible to
//!   the next `get_item`.
//! - Backends never interpret values; JSON handling belongs to the service.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod memory;
mod sqlite;

pub use memory::MemoryKeyValueStore;
pub use sqlite::SqliteKeyValueStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Transport-level failure of a key-value backend.
#[derive(Debug)]
pub enum StoreError {
    /// Backend cannot be used at all in this environment.
    Unavailable,
    /// Write rejected because the resulting size exceeds the backend quota.
    QuotaExceeded { required_bytes: usize, quota_bytes: usize },
    /// Backend schema is not ready (missing migrated table).
    MissingRequiredTable(&'static str),
    Db(DbError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "key-value store is unavailable"),
            Self::QuotaExceeded {
                required_bytes,
                quota_bytes,
            } => write!(
                f,
                "storage quota exceeded: {required_bytes} bytes required, {quota_bytes} allowed"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Synchronous string key-value storage.
pub trait KeyValueStore {
    /// Checks that the backend can serve reads and writes.
    fn probe(&self) -> StoreResult<()>;
    /// Returns the value stored under `key`, if any.
    fn get_item(&self, key: &str) -> StoreResult<Option<String>>;
    /// Stores `value` under `key`, replacing any previous value.
    fn set_item(&mut self, key: &str, value: &str) -> StoreResult<()>;
    /// Removes `key`. Removing a missing key is not an error.
    fn remove_item(&mut self, key: &str) -> StoreResult<()>;
}
