//! JSON export/import payload.
//!
//! # Invariants
//! - Import requires `categories` and `notes` to be JSON arrays.
//! - `files` in an import payload is ignored; files are always rebuilt.
//! - Parsing never mutates state; callers apply the result.

use crate::model::category::Category;
use crate::model::note::Note;
use crate::model::note_file::NoteFile;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Document written by `export_data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload {
    pub categories: Vec<Category>,
    pub notes: Vec<Note>,
    pub files: Vec<NoteFile>,
    pub exported_at: String,
}

/// Authoritative collections extracted from an import document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPayload {
    pub categories: Vec<Category>,
    pub notes: Vec<Note>,
}

/// Reason an import document was rejected.
#[derive(Debug)]
pub enum ImportError {
    /// Input is not valid JSON.
    Syntax(serde_json::Error),
    /// Required top-level field is absent or not an array.
    MissingArray(&'static str),
    /// Field is an array but its records do not match the model.
    InvalidRecords {
        field: &'static str,
        source: serde_json::Error,
    },
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax(err) => write!(f, "import payload is not valid JSON: {err}"),
            Self::MissingArray(field) => {
                write!(f, "import payload must contain a `{field}` array")
            }
            Self::InvalidRecords { field, source } => {
                write!(f, "invalid records in `{field}`: {source}")
            }
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Syntax(err) => Some(err),
            Self::MissingArray(_) => None,
            Self::InvalidRecords { source, .. } => Some(source),
        }
    }
}

/// Parses and validates an import document.
pub fn parse_import(json: &str) -> Result<ImportPayload, ImportError> {
    let mut document: Value = serde_json::from_str(json).map_err(ImportError::Syntax)?;
    let categories = take_array(&mut document, "categories")?;
    let notes = take_array(&mut document, "notes")?;

    Ok(ImportPayload {
        categories: decode_records(categories, "categories")?,
        notes: decode_records(notes, "notes")?,
    })
}

fn take_array(document: &mut Value, field: &'static str) -> Result<Value, ImportError> {
    match document.get_mut(field) {
        Some(value) if value.is_array() => Ok(value.take()),
        _ => Err(ImportError::MissingArray(field)),
    }
}

fn decode_records<T: serde::de::DeserializeOwned>(
    value: Value,
    field: &'static str,
) -> Result<Vec<T>, ImportError> {
    serde_json::from_value(value).map_err(|source| ImportError::InvalidRecords { field, source })
}
