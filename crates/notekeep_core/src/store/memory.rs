//! In-memory key-value backend.

use super::{KeyValueStore, StoreError, StoreResult};
use std::collections::BTreeMap;

/// `BTreeMap`-backed store with an optional byte quota.
///
/// Quota accounting counts key and value bytes of every entry, mirroring how
/// browser storage budgets are measured.
#[derive(Debug, Clone)]
pub struct MemoryKeyValueStore {
    entries: BTreeMap<String, String>,
    quota_bytes: Option<usize>,
    available: bool,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            quota_bytes: None,
            available: true,
        }
    }

    /// Store whose writes fail once total size would exceed `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::new()
        }
    }

    /// Store that fails every call with `StoreError::Unavailable`.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Seeds a raw value, bypassing quota checks.
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total bytes currently accounted against the quota.
    pub fn used_bytes(&self) -> usize {
        self.entries
            .iter()
            .map(|(key, value)| key.len() + value.len())
            .sum()
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.available {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }
}

impl Default for MemoryKeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn probe(&self) -> StoreResult<()> {
        self.ensure_available()
    }

    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        self.ensure_available()?;
        Ok(self.entries.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.ensure_available()?;
        if let Some(quota_bytes) = self.quota_bytes {
            let previous = self
                .entries
                .get(key)
                .map_or(0, |old| key.len() + old.len());
            let required_bytes = self.used_bytes() - previous + key.len() + value.len();
            if required_bytes > quota_bytes {
                return Err(StoreError::QuotaExceeded {
                    required_bytes,
                    quota_bytes,
                });
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> StoreResult<()> {
        self.ensure_available()?;
        self.entries.remove(key);
        Ok(())
    }
}
