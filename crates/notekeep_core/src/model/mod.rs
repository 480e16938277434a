//! Domain model for categorized notes and their derived file projection.
//!
//! # Responsibility
//! - Define the wire shapes persisted in the key-value store.
//! - Keep JSON field naming stable (`camelCase`) for import/export.
//!
//! # Invariants
//! - `Category` and `Note` are authoritative; `NoteFile` is always derivable.
//! - Timestamps are ISO-8601 UTC strings with millisecond precision.

pub mod category;
pub mod note;
pub mod note_file;
pub mod share;
pub mod shared_file;

use chrono::{DateTime, SecondsFormat, Utc};

/// Formats a UTC instant the way persisted timestamps are written.
///
/// Example: `2026-10-16T09:30:00.000Z`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
