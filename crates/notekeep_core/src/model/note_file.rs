//! Derived per-category file projection.

use crate::model::note::Note;
use serde::{Deserialize, Serialize};

/// Id of the permanent synthetic file holding uncategorized notes.
pub const UNCATEGORIZED_FILE_ID: &str = "uncategorized";
/// Display name of the uncategorized file.
pub const UNCATEGORIZED_FILE_NAME: &str = "Uncategorized";

/// File-explorer view of one category and its notes.
///
/// Fully reconstructible from categories and notes; holds no authoritative
/// state of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteFile {
    pub id: String,
    pub name: String,
    pub notes: Vec<Note>,
    pub created_at: String,
    pub updated_at: String,
}

impl NoteFile {
    /// Creates an empty file with both timestamps set to `now`.
    pub fn empty(id: impl Into<String>, name: impl Into<String>, now: &str) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            notes: Vec::new(),
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }

    /// Creates the synthetic uncategorized file.
    pub fn uncategorized(now: &str) -> Self {
        Self::empty(UNCATEGORIZED_FILE_ID, UNCATEGORIZED_FILE_NAME, now)
    }

    pub fn is_uncategorized(&self) -> bool {
        self.id == UNCATEGORIZED_FILE_ID
    }
}
