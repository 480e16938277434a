//! Time sources for timestamps and debounce deadlines.
//!
//! # Responsibility
//! - Provide wall-clock time to the persistence service.
//! - Allow tests to drive debounce deadlines deterministically.
//!
//! # Invariants
//! - `ManualClock` only moves when `advance`/`set` is called.

use chrono::{DateTime, Duration, Utc};
use std::cell::Cell;
use std::rc::Rc;

/// Wall-clock source used by the persistence service.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// System UTC clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock shared between a test and the service it drives.
///
/// Clones observe the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    /// Moves the clock forward by `millis` milliseconds.
    pub fn advance_millis(&self, millis: i64) {
        self.now.set(self.now.get() + Duration::milliseconds(millis));
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.now.set(at);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}
