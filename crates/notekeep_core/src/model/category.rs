//! Category model.

use serde::{Deserialize, Serialize};

/// Named grouping for notes.
///
/// `parent_id` is part of the persisted shape but categories are flat; it is
/// always written as `null` by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl Category {
    /// Creates a top-level category with a caller-provided id.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent_id: None,
        }
    }
}

/// Partial update applied by `PersistenceService::update_category`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryPatch {
    pub name: Option<String>,
}

impl CategoryPatch {
    pub(crate) fn apply(&self, category: &mut Category) {
        if let Some(name) = self.name.as_ref() {
            category.name = name.clone();
        }
    }
}
