//! Derivation of the per-category file projection.
//!
//! # Responsibility
//! - Rebuild `NoteFile` lists from categories and notes.
//!
//! # Invariants
//! - Exactly one `uncategorized` file exists in every returned list.
//! - After `sync_files_with_categories`, non-uncategorized file ids equal the
//!   category ids.
//! - Every note lands in exactly one file, in note collection order.
//! - Existing files keep their `created_at`.

use crate::model::category::Category;
use crate::model::note::Note;
use crate::model::note_file::{NoteFile, UNCATEGORIZED_FILE_ID};

/// Full resync: align files with categories, then redistribute notes.
pub fn sync_files_with_categories(
    files: Vec<NoteFile>,
    categories: &[Category],
    notes: &[Note],
    now: &str,
) -> Vec<NoteFile> {
    let files = align_files_with_categories(files, categories, now);
    sync_files_with_notes(files, notes, now)
}

/// Creates, renames and drops files so they mirror `categories`.
///
/// Notes inside files are left untouched.
pub fn align_files_with_categories(
    mut files: Vec<NoteFile>,
    categories: &[Category],
    now: &str,
) -> Vec<NoteFile> {
    ensure_uncategorized(&mut files, now);

    for category in categories {
        match files.iter_mut().find(|file| file.id == category.id) {
            Some(existing) => {
                existing.name = category.name.clone();
                existing.updated_at = now.to_string();
            }
            None => files.push(NoteFile::empty(
                category.id.as_str(),
                category.name.as_str(),
                now,
            )),
        }
    }

    files.retain(|file| {
        file.is_uncategorized() || categories.iter().any(|category| category.id == file.id)
    });
    dedup_uncategorized(&mut files);
    files
}

/// Clears every file and reassigns notes by `category_id`.
///
/// Notes pointing at a category without a file fall back to `uncategorized`.
pub fn sync_files_with_notes(mut files: Vec<NoteFile>, notes: &[Note], now: &str) -> Vec<NoteFile> {
    ensure_uncategorized(&mut files, now);
    for file in &mut files {
        file.notes.clear();
    }

    for note in notes {
        let target = note.category_id.as_deref().unwrap_or(UNCATEGORIZED_FILE_ID);
        let index = files
            .iter()
            .position(|file| file.id == target)
            .or_else(|| files.iter().position(NoteFile::is_uncategorized));
        if let Some(index) = index {
            let file = &mut files[index];
            file.notes.push(note.clone());
            file.updated_at = now.to_string();
        }
    }

    files
}

fn ensure_uncategorized(files: &mut Vec<NoteFile>, now: &str) {
    if !files.iter().any(NoteFile::is_uncategorized) {
        files.push(NoteFile::uncategorized(now));
    }
}

fn dedup_uncategorized(files: &mut Vec<NoteFile>) {
    let mut seen = false;
    files.retain(|file| {
        if !file.is_uncategorized() {
            return true;
        }
        let keep = !seen;
        seen = true;
        keep
    });
}

#[cfg(test)]
mod tests {
    use super::{align_files_with_categories, sync_files_with_categories, sync_files_with_notes};
    use crate::model::category::Category;
    use crate::model::note::Note;
    use crate::model::note_file::{NoteFile, UNCATEGORIZED_FILE_ID};

    const T0: &str = "2026-01-01T00:00:00.000Z";
    const T1: &str = "2026-01-02T00:00:00.000Z";

    fn note(id: &str, category: Option<&str>) -> Note {
        Note::with_id(id, id, "", category.map(str::to_string), T0)
    }

    fn ids(files: &[NoteFile]) -> Vec<&str> {
        files.iter().map(|file| file.id.as_str()).collect()
    }

    #[test]
    fn empty_input_yields_only_uncategorized_file() {
        let files = sync_files_with_categories(Vec::new(), &[], &[], T0);
        assert_eq!(ids(&files), vec![UNCATEGORIZED_FILE_ID]);
        assert_eq!(files[0].name, "Uncategorized");
    }

    #[test]
    fn category_rename_updates_existing_file_and_keeps_created_at() {
        let first = align_files_with_categories(Vec::new(), &[Category::new("c1", "Work")], T0);
        let second = align_files_with_categories(first, &[Category::new("c1", "Office")], T1);

        let file = second.iter().find(|file| file.id == "c1").unwrap();
        assert_eq!(file.name, "Office");
        assert_eq!(file.created_at, T0);
        assert_eq!(file.updated_at, T1);
    }

    #[test]
    fn removed_category_drops_its_file_but_never_uncategorized() {
        let categories = [Category::new("c1", "Work"), Category::new("c2", "Home")];
        let files = align_files_with_categories(Vec::new(), &categories, T0);
        let files = align_files_with_categories(files, &categories[1..], T1);
        assert_eq!(ids(&files), vec![UNCATEGORIZED_FILE_ID, "c2"]);
    }

    #[test]
    fn notes_are_distributed_in_collection_order() {
        let categories = [Category::new("c1", "Work")];
        let notes = [note("n1", Some("c1")), note("n2", None), note("n3", Some("c1"))];
        let files = sync_files_with_categories(Vec::new(), &categories, &notes, T1);

        let work = files.iter().find(|file| file.id == "c1").unwrap();
        let work_ids: Vec<_> = work.notes.iter().map(|note| note.id.as_str()).collect();
        assert_eq!(work_ids, vec!["n1", "n3"]);

        let loose = files.iter().find(|file| file.is_uncategorized()).unwrap();
        assert_eq!(loose.notes.len(), 1);
        assert_eq!(loose.notes[0].id, "n2");
    }

    #[test]
    fn dangling_category_id_falls_back_to_uncategorized() {
        let files = sync_files_with_notes(Vec::new(), &[note("n1", Some("ghost"))], T0);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].notes[0].id, "n1");
    }

    #[test]
    fn resync_replaces_stale_note_membership() {
        let categories = [Category::new("c1", "Work")];
        let files = sync_files_with_categories(Vec::new(), &categories, &[note("n1", Some("c1"))], T0);
        let files = sync_files_with_notes(files, &[note("n1", None)], T1);

        let work = files.iter().find(|file| file.id == "c1").unwrap();
        assert!(work.notes.is_empty());
        let total: usize = files.iter().map(|file| file.notes.len()).sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn duplicate_uncategorized_files_are_collapsed() {
        let files = vec![NoteFile::uncategorized(T0), NoteFile::uncategorized(T0)];
        let files = align_files_with_categories(files, &[], T1);
        assert_eq!(ids(&files), vec![UNCATEGORIZED_FILE_ID]);
    }
}
