//! Core persistence logic for notekeep.
//! This crate is the single writer of note, category and file-projection state.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ServiceConfig;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::category::{Category, CategoryPatch};
pub use model::note::{Note, NotePatch};
pub use model::note_file::{NoteFile, UNCATEGORIZED_FILE_ID};
pub use model::share::{NoteShare, Recipient, SharePermission};
pub use model::shared_file::{format_file_size, FileUpload, SharedFile};
pub use service::exchange::{ExportPayload, ImportError};
pub use service::persistence::{PersistenceService, ServiceError, ServiceResult, StorageKey};
pub use service::share::ShareAccessError;
pub use store::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
