use notekeep_core::db::migrations::latest_version;
use notekeep_core::db::{open_db, open_db_in_memory, DbError};
use notekeep_core::{
    Category, KeyValueStore, Note, PersistenceService, ServiceConfig, SqliteKeyValueStore,
    StoreError,
};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'kv_entries');",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notekeep.db");

    let mut first = SqliteKeyValueStore::open(&path).unwrap();
    first.set_item("notes", "[]").unwrap();
    drop(first);

    let second = SqliteKeyValueStore::open(&path).unwrap();
    assert_eq!(second.get_item("notes").unwrap().as_deref(), Some("[]"));
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }

    let store_err = SqliteKeyValueStore::open(&path)
        .err()
        .expect("store open must fail on newer schema");
    assert!(matches!(store_err, StoreError::Db(_)));
}

#[test]
fn service_state_survives_reopen_after_force_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.db");

    {
        let store = SqliteKeyValueStore::open(&path).unwrap();
        let mut service = PersistenceService::new(store, ServiceConfig::default());
        assert!(service.initialize());
        assert!(service.create_category(Category::new("c1", "Work")));
        let note = Note::with_id(
            "n1",
            "Title",
            "Body",
            Some("c1".to_string()),
            "2026-03-01T12:00:00.000Z",
        );
        assert!(service.save_note(note));
        assert!(service.has_unsaved_changes());
        assert!(service.force_save());
    }

    let store = SqliteKeyValueStore::open(&path).unwrap();
    let mut service = PersistenceService::new(store, ServiceConfig::default());
    assert!(service.initialize());
    assert_eq!(service.get_notes().len(), 1);
    let file = service.get_note_file_by_category(Some("c1")).unwrap();
    assert_eq!(file.notes[0].id, "n1");
    assert_eq!(
        service.store().keys().unwrap(),
        vec![
            "categories".to_string(),
            "last_sync_timestamp".to_string(),
            "note_files".to_string(),
            "notes".to_string(),
        ]
    );
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}
