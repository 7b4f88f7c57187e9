//! Persistent storage
//!
//! Flat-file persistence: the user database, the reference data tables and the
//! price list CSV importer.

pub mod csv;
pub mod tables;
pub mod users;

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error("User already exists: {0}")]
    UserExists(String),
    #[error("Stored record for {email} is unreadable: {reason}")]
    InvalidRecord { email: String, reason: String },
    #[error("User database is not a JSON array")]
    NotAList,
    #[error("User database lock poisoned")]
    LockPoisoned,
    #[error("Storage task failed: {0}")]
    Task(String),
}
