//! Error type for queue-store backends.

use std::io;

use thiserror::Error;

/// Errors surfaced by a queue store backend.
///
/// A backend cannot distinguish transient from permanent faults, so
/// callers treat scan failures as fatal for the whole run.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O failure in the underlying engine.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Any other backend-level failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Specialized `Result` type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

// Convenience conversion for lock poisoning
impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Self::Backend(format!("lock poisoned: {e}"))
    }
}
