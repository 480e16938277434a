//! Share-link token generation and access checks for notes and files.
//!
//! # Invariants
//! - Tokens are 13 lowercase alphanumeric characters from a v4 UUID.
//! - Upserting a share for a note replaces the previous share of that note.
//! - Sharing a file again rotates its token.

use crate::model::share::{NoteShare, Recipient};
use crate::model::shared_file::SharedFile;
use crate::service::persistence::ServiceError;
use chrono::{DateTime, Utc};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const SHARE_TOKEN_LEN: usize = 13;
const FILE_ID_SUFFIX_LEN: usize = 7;

/// Reason a shared-note link could not be resolved.
#[derive(Debug)]
pub enum ShareAccessError {
    /// Link carries no token.
    MissingToken,
    /// No share matches the note id and token pair.
    InvalidLink,
    /// Share exists but its note was deleted.
    NoteNotFound(String),
    /// No shared file with this id.
    FileNotFound(String),
    /// Token does not match a private file.
    InvalidToken,
    /// Stored state could not be read.
    Service(ServiceError),
}

impl Display for ShareAccessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingToken => write!(f, "invalid access token"),
            Self::InvalidLink => {
                write!(f, "this note has not been shared or the link is invalid")
            }
            Self::NoteNotFound(note_id) => write!(f, "shared note not found: {note_id}"),
            Self::FileNotFound(file_id) => write!(f, "file not found: {file_id}"),
            Self::InvalidToken => write!(f, "invalid access token"),
            Self::Service(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ShareAccessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Service(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ServiceError> for ShareAccessError {
    fn from(value: ServiceError) -> Self {
        Self::Service(value)
    }
}

/// Generates a fresh random share token.
pub fn generate_share_token() -> String {
    random_alphanumeric(SHARE_TOKEN_LEN)
}

/// Generates an id for a file uploaded at `now`.
pub fn generate_file_id(now: DateTime<Utc>) -> String {
    format!(
        "file-{}-{}",
        now.timestamp_millis(),
        random_alphanumeric(FILE_ID_SUFFIX_LEN)
    )
}

fn random_alphanumeric(len: usize) -> String {
    Uuid::new_v4().simple().to_string().chars().take(len).collect()
}

fn without_blank_emails(recipients: Vec<Recipient>) -> Vec<Recipient> {
    recipients
        .into_iter()
        .filter(|recipient| !recipient.email.trim().is_empty())
        .collect()
}

/// Builds a share with blank-email recipients removed.
pub fn new_share(
    note_id: impl Into<String>,
    is_public: bool,
    recipients: Vec<Recipient>,
    now: String,
) -> NoteShare {
    NoteShare {
        note_id: note_id.into(),
        token: generate_share_token(),
        is_public,
        created_at: now,
        recipients: without_blank_emails(recipients),
    }
}

/// Marks `file` shared with a fresh token and the non-blank `recipients`.
pub fn share_file_record(file: &mut SharedFile, is_public: bool, recipients: Vec<Recipient>) {
    file.is_public = is_public;
    file.shared_with = without_blank_emails(recipients);
    file.share_token = Some(generate_share_token());
}

/// Inserts `share`, replacing any existing share for the same note.
pub fn upsert_share(shares: &mut Vec<NoteShare>, share: NoteShare) {
    match shares
        .iter_mut()
        .find(|existing| existing.note_id == share.note_id)
    {
        Some(existing) => *existing = share,
        None => shares.push(share),
    }
}

/// Finds the share matching both `note_id` and `token`.
pub fn find_share<'a>(
    shares: &'a [NoteShare],
    note_id: &str,
    token: &str,
) -> Result<&'a NoteShare, ShareAccessError> {
    if token.trim().is_empty() {
        return Err(ShareAccessError::MissingToken);
    }
    shares
        .iter()
        .find(|share| share.note_id == note_id && share.token == token)
        .ok_or(ShareAccessError::InvalidLink)
}

/// Finds the file `file_id` if `token` grants access to it.
///
/// A public file accepts any non-empty token; a private one needs its own.
pub fn find_shared_file<'a>(
    files: &'a [SharedFile],
    file_id: &str,
    token: &str,
) -> Result<&'a SharedFile, ShareAccessError> {
    if token.trim().is_empty() {
        return Err(ShareAccessError::MissingToken);
    }
    let file = files
        .iter()
        .find(|file| file.id == file_id)
        .ok_or_else(|| ShareAccessError::FileNotFound(file_id.to_string()))?;
    if file.is_public || file.share_token.as_deref() == Some(token) {
        Ok(file)
    } else {
        Err(ShareAccessError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        find_share, find_shared_file, generate_file_id, generate_share_token, new_share,
        share_file_record, upsert_share, ShareAccessError,
    };
    use crate::model::share::Recipient;
    use crate::model::shared_file::{FileUpload, SharedFile};
    use chrono::{TimeZone, Utc};

    const T0: &str = "2026-01-01T00:00:00.000Z";

    #[test]
    fn token_is_short_lowercase_alphanumeric() {
        let token = generate_share_token();
        assert_eq!(token.len(), 13);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_ne!(token, generate_share_token());
    }

    #[test]
    fn blank_recipients_are_dropped() {
        let share = new_share(
            "n1",
            false,
            vec![Recipient::view("a@example.com"), Recipient::view("  ")],
            T0.to_string(),
        );
        assert_eq!(share.recipients.len(), 1);
    }

    #[test]
    fn upsert_replaces_share_for_same_note() {
        let mut shares = Vec::new();
        upsert_share(&mut shares, new_share("n1", false, Vec::new(), T0.to_string()));
        let replacement = new_share("n1", true, Vec::new(), T0.to_string());
        let token = replacement.token.clone();
        upsert_share(&mut shares, replacement);

        assert_eq!(shares.len(), 1);
        assert!(shares[0].is_public);
        assert!(find_share(&shares, "n1", &token).is_ok());
    }

    #[test]
    fn lookup_requires_matching_token() {
        let shares = vec![new_share("n1", true, Vec::new(), T0.to_string())];
        assert!(matches!(
            find_share(&shares, "n1", ""),
            Err(ShareAccessError::MissingToken)
        ));
        assert!(matches!(
            find_share(&shares, "n1", "wrong"),
            Err(ShareAccessError::InvalidLink)
        ));
    }

    fn uploaded(id: &str) -> SharedFile {
        let upload = FileUpload {
            name: "a.txt".to_string(),
            size: 3,
            mime_type: "text/plain".to_string(),
            url: "file:///tmp/a.txt".to_string(),
        };
        SharedFile::from_upload(id, upload, T0)
    }

    #[test]
    fn file_id_embeds_upload_millis() {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let id = generate_file_id(at);
        let prefix = format!("file-{}-", at.timestamp_millis());
        assert!(id.starts_with(&prefix));
        assert_eq!(id.len(), prefix.len() + 7);
    }

    #[test]
    fn resharing_a_file_rotates_token_and_filters_recipients() {
        let mut file = uploaded("f1");
        share_file_record(&mut file, false, vec![Recipient::view("a@example.com")]);
        let first = file.share_token.clone().unwrap();

        share_file_record(&mut file, true, vec![Recipient::view(" ")]);
        assert!(file.is_public);
        assert!(file.shared_with.is_empty());
        assert_ne!(file.share_token.as_deref(), Some(first.as_str()));
    }

    #[test]
    fn private_file_needs_its_own_token() {
        let mut file = uploaded("f1");
        share_file_record(&mut file, false, Vec::new());
        let token = file.share_token.clone().unwrap();
        let files = vec![file];

        assert!(find_shared_file(&files, "f1", &token).is_ok());
        assert!(matches!(
            find_shared_file(&files, "f1", "other"),
            Err(ShareAccessError::InvalidToken)
        ));
        assert!(matches!(
            find_shared_file(&files, "f2", &token),
            Err(ShareAccessError::FileNotFound(_))
        ));
        assert!(matches!(
            find_shared_file(&files, "f1", ""),
            Err(ShareAccessError::MissingToken)
        ));
    }

    #[test]
    fn public_file_accepts_any_token() {
        let mut file = uploaded("f1");
        share_file_record(&mut file, true, Vec::new());
        let files = vec![file];
        assert!(find_shared_file(&files, "f1", "anything").is_ok());
    }
}
