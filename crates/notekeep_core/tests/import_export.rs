mod common;

use common::{
    assert_files_consistent, category, note, note_ids, service, service_with, SAVE_DELAY_MS,
};
use notekeep_core::{ExportPayload, MemoryKeyValueStore};

#[test]
fn export_then_import_round_trips_categories_and_notes() {
    let (mut source, _clock) = service();
    assert!(source.save_categories(&[category("c1", "Work"), category("c2", "Home")]));
    assert!(source.save_notes(&[note("n2", Some("c2")), note("n1", Some("c1")), note("n3", None)]));
    let exported = source.export_data();

    let (mut target, _clock) = service();
    assert!(target.import_data(&exported));

    assert_eq!(target.get_categories(), source.get_categories());
    assert_eq!(target.get_notes(), source.get_notes());
    assert_files_consistent(&target);
}

#[test]
fn export_contains_all_sections() {
    let (mut service, _clock) = service();
    assert!(service.save_categories(&[category("c1", "Work")]));
    assert!(service.save_notes(&[note("n1", Some("c1"))]));

    let payload: ExportPayload = serde_json::from_str(&service.export_data()).unwrap();
    assert_eq!(payload.categories.len(), 1);
    assert_eq!(payload.notes.len(), 1);
    assert_eq!(payload.files.len(), 2);
    assert_eq!(payload.exported_at, "2026-03-01T12:00:00.000Z");
}

#[test]
fn import_of_empty_collections_clears_notes() {
    let (mut service, _clock) = service();
    assert!(service.save_notes(&[note("n1", None)]));

    assert!(service.import_data(r#"{"categories":[],"notes":[]}"#));

    assert!(service.get_notes().is_empty());
    assert_files_consistent(&service);
}

#[test]
fn import_without_required_arrays_leaves_state_unchanged() {
    let (mut service, _clock) = service();
    assert!(service.save_categories(&[category("c1", "Work")]));
    assert!(service.save_notes(&[note("n1", Some("c1"))]));
    let categories = service.get_categories();
    let notes = service.get_notes();
    let files = service.get_note_files();

    assert!(!service.import_data(r#"{"foo":1}"#));
    assert!(!service.import_data("not json"));
    assert!(!service.import_data(r#"{"categories":[],"notes":[{"id":"broken"}]}"#));

    assert_eq!(service.get_categories(), categories);
    assert_eq!(service.get_notes(), notes);
    assert_eq!(service.get_note_files(), files);
}

#[test]
fn import_discards_pending_writes_and_ignores_files_section() {
    let (mut service, _clock) = service();
    assert!(service.save_note(note("draft", None)));

    let json = r#"{
        "categories": [{"id": "c9", "name": "Imported", "parentId": null}],
        "notes": [],
        "files": [{"id": "bogus", "name": "Bogus", "notes": [], "createdAt": "x", "updatedAt": "x"}]
    }"#;
    assert!(service.import_data(json));

    assert!(!service.has_unsaved_changes());
    assert!(service.get_note_file_by_category(Some("bogus")).is_none());
    assert_eq!(
        service.get_note_file_by_category(Some("c9")).unwrap().name,
        "Imported"
    );
    assert_files_consistent(&service);
}

#[test]
fn import_that_exceeds_quota_keeps_pending_edits_and_categories() {
    let (mut service, clock) = service_with(MemoryKeyValueStore::with_quota(3_000));
    assert!(service.save_categories(&[category("c1", "Work")]));
    assert!(service.save_note(note("n1", None)));

    let mut oversized = note("big", None);
    oversized.content = "x".repeat(5_000);
    let json = serde_json::json!({
        "categories": [category("c9", "Imported")],
        "notes": [oversized],
    })
    .to_string();

    assert!(!service.import_data(&json));
    assert!(service.has_unsaved_changes());
    assert_eq!(service.get_categories(), vec![category("c1", "Work")]);

    clock.advance_millis(SAVE_DELAY_MS);
    assert_eq!(service.flush_due(), 1);
    assert_eq!(note_ids(&service.get_notes()), vec!["n1"]);
    assert_files_consistent(&service);
}
