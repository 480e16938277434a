#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use notekeep_core::{
    Category, ManualClock, MemoryKeyValueStore, Note, PersistenceService, ServiceConfig,
};

pub type TestService = PersistenceService<MemoryKeyValueStore, ManualClock>;

pub const SAVE_DELAY_MS: i64 = 300;

pub fn clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap())
}

pub fn service_with(store: MemoryKeyValueStore) -> (TestService, ManualClock) {
    let clock = clock();
    let mut service = PersistenceService::with_clock(store, ServiceConfig::default(), clock.clone());
    service.initialize();
    (service, clock)
}

pub fn service() -> (TestService, ManualClock) {
    service_with(MemoryKeyValueStore::new())
}

pub fn note(id: &str, category_id: Option<&str>) -> Note {
    Note::with_id(
        id,
        format!("title {id}"),
        format!("content {id}"),
        category_id.map(str::to_string),
        "2026-03-01T12:00:00.000Z",
    )
}

pub fn category(id: &str, name: &str) -> Category {
    Category::new(id, name)
}

pub fn note_ids(notes: &[Note]) -> Vec<&str> {
    notes.iter().map(|note| note.id.as_str()).collect()
}

/// Asserts the file projection mirrors categories and notes exactly.
pub fn assert_files_consistent(service: &TestService) {
    let categories = service.get_categories();
    let notes = service.get_notes();
    let files = service.get_note_files();

    assert_eq!(files.len(), categories.len() + 1);
    assert_eq!(files.iter().filter(|file| file.is_uncategorized()).count(), 1);
    for category in &categories {
        assert!(
            files.iter().any(|file| file.id == category.id),
            "missing file for category {}",
            category.id
        );
    }

    let mut from_files: Vec<&str> = files
        .iter()
        .flat_map(|file| file.notes.iter().map(|note| note.id.as_str()))
        .collect();
    let mut expected = note_ids(&notes);
    from_files.sort_unstable();
    expected.sort_unstable();
    assert_eq!(from_files, expected);
}
