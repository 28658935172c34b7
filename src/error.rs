//! Error types for the cache utility
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache utility.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The backing store could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// The backing store refused a write because it is full
    #[error("Quota exceeded writing '{key}': {needed} bytes needed, {available} available")]
    QuotaExceeded {
        key: String,
        needed: usize,
        available: usize,
    },

    /// A value or argument list could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A session command could not be parsed
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Storage(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache utility.
pub type Result<T> = std::result::Result<T, CacheError>;
