//! Uploaded file records offered through share links.
//!
//! # Invariants
//! - `id` has the form `file-<unix millis>-<7 random chars>`.
//! - `share_token` is absent until the file is shared for the first time.
//! - `shared_with` never contains blank emails.

use crate::model::share::Recipient;
use serde::{Deserialize, Serialize};

/// Metadata of a file handed to the service for sharing.
///
/// The bytes themselves live wherever `url` points; only the record is
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedFile {
    pub id: String,
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub url: String,
    pub uploaded_at: String,
    #[serde(default)]
    pub shared_with: Vec<Recipient>,
    pub is_public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_token: Option<String>,
}

impl SharedFile {
    /// Builds an unshared record for `upload`.
    pub fn from_upload(id: impl Into<String>, upload: FileUpload, uploaded_at: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: upload.name,
            size: upload.size,
            mime_type: upload.mime_type,
            url: upload.url,
            uploaded_at: uploaded_at.into(),
            shared_with: Vec::new(),
            is_public: false,
            share_token: None,
        }
    }

    /// Share URL under `base_url`, or `None` while the file was never shared.
    pub fn link(&self, base_url: &str) -> Option<String> {
        let token = self.share_token.as_deref()?;
        Some(format!(
            "{}/shared-files/{}?token={token}",
            base_url.trim_end_matches('/'),
            self.id
        ))
    }
}

/// Human-readable size the way file listings print it (`1.5 KB`).
pub fn format_file_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let value = bytes as f64;
    if value < KB {
        format!("{bytes} bytes")
    } else if value < MB {
        format!("{:.1} KB", value / KB)
    } else if value < GB {
        format!("{:.1} MB", value / MB)
    } else {
        format!("{:.1} GB", value / GB)
    }
}
