//! Persistence service over a key-value store.
//!
//! # Responsibility
//! - Be the only writer of the `categories`, `notes`, `note_files`,
//!   `last_sync_timestamp`, `shares` and `shared_files` keys.
//! - Rebuild the derived file projection on every category or note write.
//! - Coalesce rapid single-note writes through a per-note debounce queue.
//!
//! # Invariants
//! - Public operations never panic and never return errors; failures are
//!   logged and reported as `false`, `None` or an empty collection.
//! - Full-collection rewrites cancel pending writes for notes they remove.
//! - An unavailable store turns the service into a logged-once no-op.
//! - Note content is never written to logs.

use crate::clock::{Clock, SystemClock};
use crate::config::ServiceConfig;
use crate::model::category::{Category, CategoryPatch};
use crate::model::format_timestamp;
use crate::model::note::{Note, NotePatch};
use crate::model::note_file::{NoteFile, UNCATEGORIZED_FILE_ID};
use crate::model::share::{NoteShare, Recipient};
use crate::model::shared_file::{FileUpload, SharedFile};
use crate::service::debounce::{DebounceQueue, PendingWrite};
use crate::service::exchange::{parse_import, ExportPayload, ImportError, ImportPayload};
use crate::service::file_sync;
use crate::service::share::{
    find_share, find_shared_file, generate_file_id, new_share, share_file_record, upsert_share,
    ShareAccessError,
};
use crate::store::{KeyValueStore, StoreError};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Keys owned by the persistence service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKey {
    Categories,
    Notes,
    Files,
    LastSync,
    Shares,
    SharedFiles,
}

impl StorageKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::Notes => "notes",
            Self::Files => "note_files",
            Self::LastSync => "last_sync_timestamp",
            Self::Shares => "shares",
            Self::SharedFiles => "shared_files",
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Internal failure of a persistence operation.
#[derive(Debug)]
pub enum ServiceError {
    /// Store failed its availability probe during `initialize`.
    Unavailable,
    Store(StoreError),
    /// Stored JSON under `key` could not be encoded or decoded.
    Serialization {
        key: &'static str,
        source: serde_json::Error,
    },
    NoteNotFound(String),
    CategoryNotFound(String),
    FileNotFound(String),
    /// An entity with the same id already exists.
    DuplicateId(String),
    /// Note references a category id that does not exist.
    UnknownCategory(String),
    Import(ImportError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "persistent storage is unavailable"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Serialization { key, source } => {
                write!(f, "invalid JSON under key `{key}`: {source}")
            }
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::CategoryNotFound(id) => write!(f, "category not found: {id}"),
            Self::FileNotFound(id) => write!(f, "shared file not found: {id}"),
            Self::DuplicateId(id) => write!(f, "id already exists: {id}"),
            Self::UnknownCategory(id) => write!(f, "unknown category id: {id}"),
            Self::Import(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Serialization { source, .. } => Some(source),
            Self::Import(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Unavailable => Self::Unavailable,
            other => Self::Store(other),
        }
    }
}

impl From<ImportError> for ServiceError {
    fn from(value: ImportError) -> Self {
        Self::Import(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServiceState {
    Uninitialized,
    Ready,
    Unavailable,
}

/// Gateway between application state and the durable key-value store.
///
/// Owns its store, so no other code path can write the keys it manages.
/// Deferred writes are flushed by the host calling [`flush_due`] from its
/// event loop, and [`force_save`] before shutdown.
///
/// [`flush_due`]: PersistenceService::flush_due
/// [`force_save`]: PersistenceService::force_save
pub struct PersistenceService<S: KeyValueStore, C: Clock = SystemClock> {
    store: S,
    clock: C,
    state: ServiceState,
    pending: DebounceQueue<Note>,
}

impl<S: KeyValueStore> PersistenceService<S, SystemClock> {
    /// Creates a service using the system clock.
    pub fn new(store: S, config: ServiceConfig) -> Self {
        Self::with_clock(store, config, SystemClock)
    }
}

impl<S: KeyValueStore, C: Clock> PersistenceService<S, C> {
    /// Creates a service with an explicit time source.
    pub fn with_clock(store: S, config: ServiceConfig, clock: C) -> Self {
        let pending = DebounceQueue::new(config.save_delay_chrono());
        Self {
            store,
            clock,
            state: ServiceState::Uninitialized,
            pending,
        }
    }

    /// Read-only access to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consumes the service and returns its store.
    ///
    /// Pending debounced writes are discarded; call `force_save` first.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Returns `false` once the store failed its availability probe.
    pub fn is_available(&self) -> bool {
        self.state != ServiceState::Unavailable
    }

    /// Seeds missing collections and stamps the sync timestamp.
    ///
    /// Idempotent. On an unavailable store this logs once and switches the
    /// service into no-op mode; it never panics.
    pub fn initialize(&mut self) -> bool {
        match self.state {
            ServiceState::Ready => return true,
            ServiceState::Unavailable => return false,
            ServiceState::Uninitialized => {}
        }

        if let Err(err) = self.store.probe() {
            error!(
                "event=storage_init module=persistence status=error error_code=store_unavailable error={err}"
            );
            self.state = ServiceState::Unavailable;
            return false;
        }

        match self.try_initialize() {
            Ok(seeded_files) => {
                self.state = ServiceState::Ready;
                info!(
                    "event=storage_init module=persistence status=ok seeded_files={seeded_files}"
                );
                true
            }
            Err(err) => {
                error!("event=storage_init module=persistence status=error error={err}");
                false
            }
        }
    }

    pub fn get_categories(&self) -> Vec<Category> {
        let result = self.read_collection(StorageKey::Categories);
        self.report("categories_read", result).unwrap_or_default()
    }

    /// Returns the persisted note collection.
    ///
    /// Pending debounced writes are not included; see [`current_notes`].
    ///
    /// [`current_notes`]: PersistenceService::current_notes
    pub fn get_notes(&self) -> Vec<Note> {
        let result = self.read_collection(StorageKey::Notes);
        self.report("notes_read", result).unwrap_or_default()
    }

    pub fn get_note_files(&self) -> Vec<NoteFile> {
        let result = self.read_collection(StorageKey::Files);
        self.report("files_read", result).unwrap_or_default()
    }

    /// Persisted notes with pending debounced values overlaid.
    pub fn current_notes(&self) -> Vec<Note> {
        let mut notes = self.get_notes();
        for pending in self.pending.values() {
            upsert_note(&mut notes, pending.clone());
        }
        notes
    }

    /// Looks up one note, preferring a pending debounced value.
    pub fn get_note(&self, note_id: &str) -> Option<Note> {
        if let Some(pending) = self.pending.get(note_id) {
            return Some(pending.clone());
        }
        self.get_notes().into_iter().find(|note| note.id == note_id)
    }

    /// Notes whose `category_id` equals `category_id` (`None` = uncategorized).
    pub fn notes_by_category(&self, category_id: Option<&str>) -> Vec<Note> {
        self.current_notes()
            .into_iter()
            .filter(|note| note.category_id.as_deref() == category_id)
            .collect()
    }

    /// Case-insensitive search over note titles and content.
    pub fn search_notes(&self, query: &str) -> Vec<Note> {
        self.current_notes()
            .into_iter()
            .filter(|note| note.matches_query(query))
            .collect()
    }

    /// Overwrites all categories and rebuilds every file.
    pub fn save_categories(&mut self, categories: &[Category]) -> bool {
        let result = self.try_save_categories(categories);
        self.report("categories_save", result).is_some()
    }

    /// Overwrites all notes and redistributes them into files.
    pub fn save_notes(&mut self, notes: &[Note]) -> bool {
        let result = self.try_save_notes(notes);
        self.report("notes_save", result).is_some()
    }

    /// Schedules a debounced write of one note.
    ///
    /// Repeated calls for the same id within the debounce window replace the
    /// pending value and restart the window; only the last value is written.
    pub fn save_note(&mut self, note: Note) -> bool {
        let result = self.try_save_note(note);
        self.report("note_save", result).is_some()
    }

    /// Removes a note immediately, cancelling any pending write for it.
    pub fn delete_note(&mut self, note_id: &str) -> bool {
        let result = self.try_delete_note(note_id);
        self.report("note_delete", result).is_some()
    }

    /// Appends a new category.
    pub fn create_category(&mut self, category: Category) -> bool {
        let result = self.try_create_category(category);
        self.report("category_create", result).is_some()
    }

    pub fn update_category(&mut self, category_id: &str, patch: &CategoryPatch) -> bool {
        let result = self.try_update_category(category_id, patch);
        self.report("category_update", result).is_some()
    }

    /// Removes a category and moves its notes to uncategorized.
    pub fn delete_category(&mut self, category_id: &str) -> bool {
        let result = self.try_delete_category(category_id);
        self.report("category_delete", result).is_some()
    }

    /// Appends a new note immediately.
    ///
    /// Rejects duplicate ids and `category_id` values naming no category.
    pub fn create_note(&mut self, note: Note) -> bool {
        let result = self.try_create_note(note);
        self.report("note_create", result).is_some()
    }

    /// Merges `patch` into an existing note and schedules a debounced write.
    pub fn update_note(&mut self, note_id: &str, patch: &NotePatch) -> bool {
        let result = self.try_update_note(note_id, patch);
        self.report("note_update", result).is_some()
    }

    /// Returns the file for `category_id`, or `uncategorized` for `None`.
    pub fn get_note_file_by_category(&self, category_id: Option<&str>) -> Option<NoteFile> {
        let target = category_id.unwrap_or(UNCATEGORIZED_FILE_ID);
        self.get_note_files()
            .into_iter()
            .find(|file| file.id == target)
    }

    /// Serializes all persisted data as pretty-printed JSON.
    ///
    /// Returns an empty string when the data cannot be read or encoded.
    pub fn export_data(&self) -> String {
        let result = self.try_export_data();
        self.report("data_export", result).unwrap_or_default()
    }

    /// Replaces categories and notes from an export document.
    ///
    /// Rejects the document without mutation unless `categories` and `notes`
    /// are arrays of valid records. Pending debounced writes are discarded.
    pub fn import_data(&mut self, json: &str) -> bool {
        let result = self.try_import_data(json);
        self.report("data_import", result).is_some()
    }

    /// Timestamp of the last file projection write, or now when never synced.
    pub fn get_last_sync_timestamp(&self) -> String {
        if self.is_available() {
            if let Ok(Some(value)) = self.store.get_item(StorageKey::LastSync.as_str()) {
                return value;
            }
        }
        self.timestamp()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Number of notes waiting for their debounce window.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Earliest instant at which [`flush_due`] has work to do.
    ///
    /// [`flush_due`]: PersistenceService::flush_due
    pub fn next_flush_deadline(&self) -> Option<DateTime<Utc>> {
        self.pending.next_deadline()
    }

    /// Flushes every pending write whose debounce window has elapsed.
    ///
    /// Returns the number of notes written. Writes that fail stay pending and
    /// are retried one debounce window later.
    pub fn flush_due(&mut self) -> usize {
        let now = self.clock.now();
        let due = self.pending.take_due(now);
        if due.is_empty() {
            return 0;
        }

        let flushed = due.len();
        match self.persist_pending(&due) {
            Ok(()) => {
                debug!("event=note_flush module=persistence status=ok flushed={flushed}");
                flushed
            }
            Err(err) => {
                self.requeue(due);
                self.log_failure("note_flush", &err);
                0
            }
        }
    }

    /// Cancels all debounce windows and persists the full note collection now.
    pub fn force_save(&mut self) -> bool {
        let drained = self.pending.drain();
        let count = drained.len();
        match self.persist_pending(&drained) {
            Ok(()) => {
                info!("event=force_save module=persistence status=ok flushed={count}");
                true
            }
            Err(err) => {
                self.requeue(drained);
                self.log_failure("force_save", &err);
                false
            }
        }
    }

    /// Creates or replaces the share link for an existing note.
    pub fn share_note(
        &mut self,
        note_id: &str,
        is_public: bool,
        recipients: Vec<Recipient>,
    ) -> Option<NoteShare> {
        let result = self.try_share_note(note_id, is_public, recipients);
        self.report("note_share", result)
    }

    /// Removes the share link of `note_id`. Returns `false` when none existed.
    pub fn revoke_share(&mut self, note_id: &str) -> bool {
        let result = self.try_revoke_share(note_id);
        self.report("share_revoke", result).unwrap_or(false)
    }

    pub fn get_shares(&self) -> Vec<NoteShare> {
        let result = self.read_collection(StorageKey::Shares);
        self.report("shares_read", result).unwrap_or_default()
    }

    /// Resolves a shared-note link to the note it grants access to.
    pub fn resolve_shared_note(&self, note_id: &str, token: &str) -> Result<Note, ShareAccessError> {
        let shares: Vec<NoteShare> = self.read_collection(StorageKey::Shares)?;
        let share = find_share(&shares, note_id, token)?;
        self.get_note(&share.note_id)
            .ok_or_else(|| ShareAccessError::NoteNotFound(share.note_id.clone()))
    }

    /// Records an uploaded file; it stays private until shared.
    pub fn add_shared_file(&mut self, upload: FileUpload) -> Option<SharedFile> {
        let result = self.try_add_shared_file(upload);
        self.report("file_add", result)
    }

    /// Removes a file record, which also invalidates its share link.
    pub fn delete_shared_file(&mut self, file_id: &str) -> bool {
        let result = self.try_delete_shared_file(file_id);
        self.report("file_delete", result).is_some()
    }

    /// Issues a new share token for a file and replaces its recipients.
    pub fn share_file(
        &mut self,
        file_id: &str,
        is_public: bool,
        recipients: Vec<Recipient>,
    ) -> Option<SharedFile> {
        let result = self.try_share_file(file_id, is_public, recipients);
        self.report("file_share", result)
    }

    pub fn get_shared_files(&self) -> Vec<SharedFile> {
        let result = self.read_collection(StorageKey::SharedFiles);
        self.report("files_shared_read", result).unwrap_or_default()
    }

    /// Resolves a shared-file link to the file record it grants access to.
    pub fn resolve_shared_file(
        &self,
        file_id: &str,
        token: &str,
    ) -> Result<SharedFile, ShareAccessError> {
        let files: Vec<SharedFile> = self.read_collection(StorageKey::SharedFiles)?;
        find_shared_file(&files, file_id, token).cloned()
    }

    fn try_initialize(&mut self) -> ServiceResult<bool> {
        for key in [StorageKey::Categories, StorageKey::Notes] {
            if self.store.get_item(key.as_str())?.is_none() {
                self.store.set_item(key.as_str(), "[]")?;
            }
        }

        let seed_files = self.store.get_item(StorageKey::Files.as_str())?.is_none();
        if seed_files {
            self.store.set_item(StorageKey::Files.as_str(), "[]")?;
            self.resync_all()?;
        }

        let now = self.timestamp();
        self.store.set_item(StorageKey::LastSync.as_str(), &now)?;
        Ok(seed_files)
    }

    fn try_save_categories(&mut self, categories: &[Category]) -> ServiceResult<()> {
        self.write_collection(StorageKey::Categories, categories)?;
        self.resync_all()
    }

    fn try_save_notes(&mut self, notes: &[Note]) -> ServiceResult<()> {
        self.write_collection(StorageKey::Notes, notes)?;
        self.pending
            .retain_keys(|key| notes.iter().any(|note| note.id == key));
        self.resync_notes()
    }

    fn try_save_note(&mut self, note: Note) -> ServiceResult<()> {
        // The flush upserts into this collection; refuse to queue onto one
        // that cannot be read back.
        self.read_collection::<Note>(StorageKey::Notes)?;
        let note_id = note.id.clone();
        let now = self.clock.now();
        let coalesced = self.pending.schedule(note_id, note, now);
        debug!(
            "event=note_save_scheduled module=persistence status=ok coalesced={coalesced} pending={}",
            self.pending.len()
        );
        Ok(())
    }

    fn try_delete_note(&mut self, note_id: &str) -> ServiceResult<()> {
        let mut notes: Vec<Note> = self.read_collection(StorageKey::Notes)?;
        let before = notes.len();
        notes.retain(|note| note.id != note_id);
        self.write_collection(StorageKey::Notes, &notes)?;

        // Only this note's pending write goes; unrelated drafts stay queued.
        let cancelled = self.pending.cancel(note_id).is_some();
        debug!(
            "event=note_delete module=persistence status=ok removed={} cancelled_pending={cancelled}",
            before - notes.len()
        );
        self.resync_notes()?;
        self.try_revoke_share(note_id)?;
        Ok(())
    }

    fn try_create_category(&mut self, category: Category) -> ServiceResult<()> {
        let mut categories: Vec<Category> = self.read_collection(StorageKey::Categories)?;
        if categories.iter().any(|existing| existing.id == category.id) {
            return Err(ServiceError::DuplicateId(category.id));
        }
        categories.push(category);
        self.try_save_categories(&categories)
    }

    fn try_update_category(&mut self, category_id: &str, patch: &CategoryPatch) -> ServiceResult<()> {
        let mut categories: Vec<Category> = self.read_collection(StorageKey::Categories)?;
        let category = categories
            .iter_mut()
            .find(|category| category.id == category_id)
            .ok_or_else(|| ServiceError::CategoryNotFound(category_id.to_string()))?;
        patch.apply(category);
        self.try_save_categories(&categories)
    }

    fn try_delete_category(&mut self, category_id: &str) -> ServiceResult<()> {
        let mut categories: Vec<Category> = self.read_collection(StorageKey::Categories)?;
        let mut notes: Vec<Note> = self.read_collection(StorageKey::Notes)?;

        let mut moved = uncategorize(notes.iter_mut(), category_id);
        categories.retain(|category| category.id != category_id);

        self.write_collection(StorageKey::Notes, &notes)?;
        self.write_collection(StorageKey::Categories, &categories)?;
        moved += uncategorize(self.pending.values_mut(), category_id);
        debug!("event=category_delete module=persistence status=ok moved_notes={moved}");
        self.resync_all()
    }

    fn try_create_note(&mut self, note: Note) -> ServiceResult<()> {
        let mut notes: Vec<Note> = self.read_collection(StorageKey::Notes)?;
        if notes.iter().any(|existing| existing.id == note.id) || self.pending.get(&note.id).is_some()
        {
            return Err(ServiceError::DuplicateId(note.id));
        }
        if let Some(category_id) = note.category_id.as_deref() {
            self.ensure_category_exists(category_id)?;
        }
        notes.push(note);
        self.try_save_notes(&notes)
    }

    fn try_update_note(&mut self, note_id: &str, patch: &NotePatch) -> ServiceResult<()> {
        self.ensure_available()?;
        let mut note = match self.pending.get(note_id) {
            Some(pending) => pending.clone(),
            None => self
                .read_collection::<Note>(StorageKey::Notes)?
                .into_iter()
                .find(|note| note.id == note_id)
                .ok_or_else(|| ServiceError::NoteNotFound(note_id.to_string()))?,
        };
        if let Some(Some(category_id)) = patch.category_id.as_ref() {
            self.ensure_category_exists(category_id)?;
        }
        patch.apply(&mut note, self.timestamp());
        self.try_save_note(note)
    }

    fn try_export_data(&self) -> ServiceResult<String> {
        let payload = ExportPayload {
            categories: self.read_collection(StorageKey::Categories)?,
            notes: self.read_collection(StorageKey::Notes)?,
            files: self.read_collection(StorageKey::Files)?,
            exported_at: self.timestamp(),
        };
        serde_json::to_string_pretty(&payload).map_err(|source| ServiceError::Serialization {
            key: "export",
            source,
        })
    }

    fn try_import_data(&mut self, json: &str) -> ServiceResult<()> {
        self.ensure_available()?;
        let ImportPayload { categories, notes } = parse_import(json)?;

        let previous_categories = self.store.get_item(StorageKey::Categories.as_str())?;
        self.write_collection(StorageKey::Categories, &categories)?;
        if let Err(err) = self.write_collection(StorageKey::Notes, &notes) {
            self.restore_item(StorageKey::Categories, previous_categories);
            return Err(err);
        }

        // Drained only once both collections are written.
        let discarded = self.pending.drain().len();
        info!(
            "event=data_import module=persistence status=ok categories={} notes={} discarded_pending={discarded}",
            categories.len(),
            notes.len()
        );
        self.resync_all()
    }

    fn try_share_note(
        &mut self,
        note_id: &str,
        is_public: bool,
        recipients: Vec<Recipient>,
    ) -> ServiceResult<NoteShare> {
        if self.get_note(note_id).is_none() {
            return Err(ServiceError::NoteNotFound(note_id.to_string()));
        }
        let mut shares: Vec<NoteShare> = self.read_collection(StorageKey::Shares)?;
        let share = new_share(note_id, is_public, recipients, self.timestamp());
        upsert_share(&mut shares, share.clone());
        self.write_collection(StorageKey::Shares, &shares)?;
        Ok(share)
    }

    fn try_revoke_share(&mut self, note_id: &str) -> ServiceResult<bool> {
        let mut shares: Vec<NoteShare> = self.read_collection(StorageKey::Shares)?;
        let before = shares.len();
        shares.retain(|share| share.note_id != note_id);
        if shares.len() == before {
            return Ok(false);
        }
        self.write_collection(StorageKey::Shares, &shares)?;
        Ok(true)
    }

    fn try_add_shared_file(&mut self, upload: FileUpload) -> ServiceResult<SharedFile> {
        let mut files: Vec<SharedFile> = self.read_collection(StorageKey::SharedFiles)?;
        let file = SharedFile::from_upload(
            generate_file_id(self.clock.now()),
            upload,
            self.timestamp(),
        );
        files.push(file.clone());
        self.write_collection(StorageKey::SharedFiles, &files)?;
        debug!(
            "event=file_add module=persistence status=ok size={} files={}",
            file.size,
            files.len()
        );
        Ok(file)
    }

    fn try_delete_shared_file(&mut self, file_id: &str) -> ServiceResult<()> {
        let mut files: Vec<SharedFile> = self.read_collection(StorageKey::SharedFiles)?;
        let before = files.len();
        files.retain(|file| file.id != file_id);
        if files.len() == before {
            return Err(ServiceError::FileNotFound(file_id.to_string()));
        }
        self.write_collection(StorageKey::SharedFiles, &files)
    }

    fn try_share_file(
        &mut self,
        file_id: &str,
        is_public: bool,
        recipients: Vec<Recipient>,
    ) -> ServiceResult<SharedFile> {
        let mut files: Vec<SharedFile> = self.read_collection(StorageKey::SharedFiles)?;
        let file = files
            .iter_mut()
            .find(|file| file.id == file_id)
            .ok_or_else(|| ServiceError::FileNotFound(file_id.to_string()))?;
        share_file_record(file, is_public, recipients);
        let shared = file.clone();
        self.write_collection(StorageKey::SharedFiles, &files)?;
        Ok(shared)
    }

    /// Applies `writes` onto the persisted collection in one rewrite.
    fn persist_pending(&mut self, writes: &[PendingWrite<Note>]) -> ServiceResult<()> {
        let mut notes: Vec<Note> = self.read_collection(StorageKey::Notes)?;
        for write in writes {
            upsert_note(&mut notes, write.value.clone());
        }
        self.write_collection(StorageKey::Notes, &notes)?;
        self.resync_notes()
    }

    fn requeue(&mut self, writes: Vec<PendingWrite<Note>>) {
        let now = self.clock.now();
        for write in writes {
            if self.pending.get(&write.key).is_none() {
                self.pending.schedule(write.key, write.value, now);
            }
        }
    }

    /// Best-effort rollback of a raw value after a partial write.
    fn restore_item(&mut self, key: StorageKey, previous: Option<String>) {
        let result = match previous.as_deref() {
            Some(value) => self.store.set_item(key.as_str(), value),
            None => self.store.remove_item(key.as_str()),
        };
        if let Err(err) = result {
            error!(
                "event=rollback module=persistence status=error key={} error={err}",
                key.as_str()
            );
        }
    }

    fn ensure_category_exists(&self, category_id: &str) -> ServiceResult<()> {
        let categories: Vec<Category> = self.read_collection(StorageKey::Categories)?;
        if categories.iter().any(|category| category.id == category_id) {
            Ok(())
        } else {
            Err(ServiceError::UnknownCategory(category_id.to_string()))
        }
    }

    fn resync_all(&mut self) -> ServiceResult<()> {
        let categories: Vec<Category> = self.read_collection(StorageKey::Categories)?;
        let notes: Vec<Note> = self.read_collection(StorageKey::Notes)?;
        let files = self.read_files_for_rebuild()?;
        let now = self.timestamp();
        let files = file_sync::sync_files_with_categories(files, &categories, &notes, &now);
        self.write_files(&files, &now)
    }

    fn resync_notes(&mut self) -> ServiceResult<()> {
        let notes: Vec<Note> = self.read_collection(StorageKey::Notes)?;
        let files = self.read_files_for_rebuild()?;
        let now = self.timestamp();
        let files = file_sync::sync_files_with_notes(files, &notes, &now);
        self.write_files(&files, &now)
    }

    /// Files are derived, so a corrupt projection is rebuilt from scratch.
    fn read_files_for_rebuild(&self) -> ServiceResult<Vec<NoteFile>> {
        match self.read_collection(StorageKey::Files) {
            Err(ServiceError::Serialization { source, .. }) => {
                warn!(
                    "event=files_rebuild module=persistence status=error error_code=corrupt_projection error={source}"
                );
                Ok(Vec::new())
            }
            other => other,
        }
    }

    fn write_files(&mut self, files: &[NoteFile], now: &str) -> ServiceResult<()> {
        self.write_collection(StorageKey::Files, files)?;
        self.store.set_item(StorageKey::LastSync.as_str(), now)?;
        Ok(())
    }

    fn read_collection<T: DeserializeOwned>(&self, key: StorageKey) -> ServiceResult<Vec<T>> {
        self.ensure_available()?;
        match self.store.get_item(key.as_str())? {
            Some(json) => serde_json::from_str(&json).map_err(|source| ServiceError::Serialization {
                key: key.as_str(),
                source,
            }),
            None => Ok(Vec::new()),
        }
    }

    fn write_collection<T: Serialize>(&mut self, key: StorageKey, items: &[T]) -> ServiceResult<()> {
        self.ensure_available()?;
        let json = serde_json::to_string(items).map_err(|source| ServiceError::Serialization {
            key: key.as_str(),
            source,
        })?;
        self.store.set_item(key.as_str(), &json)?;
        Ok(())
    }

    fn ensure_available(&self) -> ServiceResult<()> {
        if self.state == ServiceState::Unavailable {
            Err(ServiceError::Unavailable)
        } else {
            Ok(())
        }
    }

    fn timestamp(&self) -> String {
        format_timestamp(self.clock.now())
    }

    fn report<T>(&self, event: &'static str, result: ServiceResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.log_failure(event, &err);
                None
            }
        }
    }

    fn log_failure(&self, event: &'static str, err: &ServiceError) {
        // Unavailability was already logged by `initialize`.
        if matches!(err, ServiceError::Unavailable) && self.state == ServiceState::Unavailable {
            return;
        }
        error!("event={event} module=persistence status=error error={err}");
    }
}

/// Clears `category_id` on matching notes, returning how many changed.
fn uncategorize<'a>(notes: impl Iterator<Item = &'a mut Note>, category_id: &str) -> usize {
    let mut moved = 0;
    for note in notes.filter(|note| note.category_id.as_deref() == Some(category_id)) {
        note.category_id = None;
        moved += 1;
    }
    moved
}

fn upsert_note(notes: &mut Vec<Note>, note: Note) {
    match notes.iter_mut().find(|existing| existing.id == note.id) {
        Some(existing) => *existing = note,
        None => notes.push(note),
    }
}
