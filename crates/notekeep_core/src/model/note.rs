//! Note model.
//!
//! # Invariants
//! - `id` is stable for the lifetime of a note.
//! - `category_id == None` means the note is uncategorized.
//! - `updated_at >= created_at` by convention; not enforced.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Color assigned to notes created without an explicit one.
pub const DEFAULT_NOTE_COLOR: &str = "#33691E";

/// Titled text document, optionally categorized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category_id: Option<String>,
    pub color: String,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
    /// ISO-8601 last modification timestamp.
    pub updated_at: String,
}

impl Note {
    /// Creates a note with a generated id and both timestamps set to `now`.
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        category_id: Option<String>,
        now: impl Into<String>,
    ) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), title, content, category_id, now)
    }

    /// Creates a note with a caller-provided id.
    ///
    /// Used by import paths and tests where identity already exists.
    pub fn with_id(
        id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        category_id: Option<String>,
        now: impl Into<String>,
    ) -> Self {
        let now = now.into();
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            category_id,
            color: DEFAULT_NOTE_COLOR.to_string(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Case-insensitive substring match against title or content.
    ///
    /// An empty (or whitespace-only) query matches every note.
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&needle) || self.content.to_lowercase().contains(&needle)
    }
}

/// Partial update merged into an existing note by `update_note`.
///
/// `category_id: Some(None)` moves the note to uncategorized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<Option<String>>,
    pub color: Option<String>,
}

impl NotePatch {
    /// Replaces content only.
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub(crate) fn apply(&self, note: &mut Note, now: String) {
        if let Some(title) = self.title.as_ref() {
            note.title = title.clone();
        }
        if let Some(content) = self.content.as_ref() {
            note.content = content.clone();
        }
        if let Some(category_id) = self.category_id.as_ref() {
            note.category_id = category_id.clone();
        }
        if let Some(color) = self.color.as_ref() {
            note.color = color.clone();
        }
        note.updated_at = now;
    }
}
