//! Share-link bookkeeping model.
//!
//! # Invariants
//! - At most one `NoteShare` exists per note id.
//! - `recipients` never contains blank emails.

use serde::{Deserialize, Serialize};

/// Access level granted to a share recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharePermission {
    View,
    Edit,
}

/// Invited recipient of a shared note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub email: String,
    pub permission: SharePermission,
}

impl Recipient {
    pub fn view(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            permission: SharePermission::View,
        }
    }
}

/// Token-protected link granting read access to one note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteShare {
    pub note_id: String,
    pub token: String,
    pub is_public: bool,
    pub created_at: String,
    #[serde(default)]
    pub recipients: Vec<Recipient>,
}

impl NoteShare {
    /// Builds the public URL for this share under `base_url`.
    ///
    /// Trailing slashes on `base_url` are ignored.
    pub fn link(&self, base_url: &str) -> String {
        format!(
            "{}/shared/{}?token={}",
            base_url.trim_end_matches('/'),
            self.note_id,
            self.token
        )
    }
}
