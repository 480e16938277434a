//! Persistence service configuration.
//!
//! # Invariants
//! - `save_delay` is clamped to `MAX_SAVE_DELAY`.

use std::time::Duration;

/// Debounce window used when no explicit delay is configured.
pub const DEFAULT_SAVE_DELAY: Duration = Duration::from_millis(300);
/// Upper bound for the debounce window.
pub const MAX_SAVE_DELAY: Duration = Duration::from_secs(60);

/// Tunables for `PersistenceService`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    save_delay: Duration,
}

impl ServiceConfig {
    /// Sets the quiet period a single-note write waits before flushing.
    pub fn with_save_delay(mut self, delay: Duration) -> Self {
        self.save_delay = delay.min(MAX_SAVE_DELAY);
        self
    }

    pub fn save_delay(&self) -> Duration {
        self.save_delay
    }

    /// Debounce window as a signed chrono duration for deadline arithmetic.
    pub(crate) fn save_delay_chrono(&self) -> chrono::Duration {
        // Clamped to 60s above, so the millisecond count always fits.
        chrono::Duration::milliseconds(self.save_delay.as_millis() as i64)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            save_delay: DEFAULT_SAVE_DELAY,
        }
    }
}
