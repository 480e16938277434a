//! Per-key debounce queue for deferred single-note writes.
//!
//! # Responsibility
//! - Hold the latest pending value per key together with its flush deadline.
//! - Hand due entries to the caller; the queue never performs I/O itself.
//!
//! # Invariants
//! - At most one pending entry exists per key.
//! - Scheduling a key that is already pending replaces its value and restarts
//!   its deadline (last write wins).

use chrono::{DateTime, Duration, Utc};

/// One deferred write waiting for its quiet period to elapse.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite<T> {
    pub key: String,
    pub value: T,
    pub due_at: DateTime<Utc>,
}

/// Deadline-based debounce map, driven by an external clock.
#[derive(Debug, Clone)]
pub struct DebounceQueue<T> {
    delay: Duration,
    pending: Vec<PendingWrite<T>>,
}

impl<T> DebounceQueue<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Vec::new(),
        }
    }

    /// Schedules `value` under `key`, due `delay` after `now`.
    ///
    /// Returns `true` when an earlier pending value for `key` was replaced.
    pub fn schedule(&mut self, key: impl Into<String>, value: T, now: DateTime<Utc>) -> bool {
        let key = key.into();
        let replaced = self.cancel(&key).is_some();
        self.pending.push(PendingWrite {
            key,
            value,
            due_at: now + self.delay,
        });
        replaced
    }

    /// Removes the pending entry for `key`, returning its value.
    pub fn cancel(&mut self, key: &str) -> Option<T> {
        let index = self.pending.iter().position(|entry| entry.key == key)?;
        Some(self.pending.remove(index).value)
    }

    /// Drops pending entries whose key fails `keep`.
    pub fn retain_keys(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.pending.retain(|entry| keep(&entry.key));
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.pending
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| &entry.value)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.pending.iter().map(|entry| &entry.value)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.pending.iter_mut().map(|entry| &mut entry.value)
    }

    /// Removes and returns every entry whose deadline is at or before `now`,
    /// in scheduling order.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Vec<PendingWrite<T>> {
        let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|entry| entry.due_at <= now);
        self.pending = waiting;
        due
    }

    /// Removes and returns every pending entry regardless of deadline.
    pub fn drain(&mut self) -> Vec<PendingWrite<T>> {
        std::mem::take(&mut self.pending)
    }

    /// Earliest deadline among pending entries.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.pending.iter().map(|entry| entry.due_at).min()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
