//! Core use-case services.
//!
//! # Responsibility
//! - Own every write to the key-value store (`persistence`).
//! - Keep derivation, debounce and exchange logic pure and separately
//!   testable.

pub mod debounce;
pub mod exchange;
pub mod file_sync;
pub mod persistence;
pub mod share;
