//! Save/load persistence for the progression record
//!
//! Features:
//! - Single durable JSON key-value record behind the [`Storage`] trait
//! - Atomic file writes (tmp → save, old save → backup)
//! - Forward-compatible structural merge with defaults on load
//! - In-memory fake for tests and hosts without a filesystem

pub mod file;
pub mod memory;
pub mod merge;

pub use file::JsonFileStorage;
pub use memory::MemoryStorage;
pub use merge::merge_with_defaults;

use thiserror::Error;

/// Default file name for the progression record
pub const SAVE_FILE_NAME: &str = "hurdz-save.json";

/// Errors that can occur while reading or writing the progression record.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Backend refused the operation.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type for persistence operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// A durable single-record store.
///
/// `write` must not return until the record is durable; the progression store
/// relies on that to keep memory and disk in step.
pub trait Storage {
    /// Read the raw record, `Ok(None)` if nothing was ever saved.
    fn read(&self) -> PersistenceResult<Option<String>>;

    /// Replace the raw record.
    fn write(&mut self, json: &str) -> PersistenceResult<()>;
}
