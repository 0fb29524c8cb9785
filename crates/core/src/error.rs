//! Error types for the Greylock engine
//!
//! A single `Error` enum is shared by all crates. We use `thiserror` for
//! automatic `Display` and `Error` trait implementations.
//!
//! Classification:
//! - `Io` / `Storage`: engine failures, propagated, not recovered
//! - `CorruptFormat` / `CorruptIndex`: a persisted value failed to decode;
//!   fatal to the operation that read it
//! - `NotFound`: a key that was required to exist is missing (posting-list
//!   and shard-set reads treat absence as empty and never raise this)
//! - `InvalidRequest`: malformed caller input, surfaced as-is
//! - `MergeFailure`: the merge operator rejected an operand; readers of the
//!   affected key will surface `CorruptIndex`

use std::io;
use thiserror::Error;

/// Result type alias for Greylock operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type shared across the Greylock crates
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the filesystem layer
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failed to serialize a value on the write path
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A persisted value failed to decode
    #[error("corrupt record at key '{key}': {reason}")]
    CorruptFormat {
        /// Key whose value failed to decode
        key: String,
        /// Decoder failure description
        reason: String,
    },

    /// A posting list failed to decode; the whole query is aborted
    #[error("corrupt posting list at key '{key}'")]
    CorruptIndex {
        /// Posting-list key whose value failed to decode
        key: String,
    },

    /// A key that was required to exist is missing
    #[error("key not found: '{0}'")]
    NotFound(String),

    /// Malformed query or index request
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The merge operator rejected an operand for this key
    #[error("merge rejected for key '{key}': {reason}")]
    MergeFailure {
        /// Key whose merge was rejected
        key: String,
        /// Why the operand was rejected
        reason: String,
    },

    /// Key-value engine failure
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl Error {
    /// Build a `Storage` error from any displayable engine failure
    pub fn storage(message: impl ToString) -> Self {
        Error::Storage(message.to_string())
    }

    /// Build a `CorruptFormat` error for a key
    pub fn corrupt(key: impl Into<String>, reason: impl ToString) -> Self {
        Error::CorruptFormat {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Check whether this error is a missing-key condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Check whether this error indicates corrupted persisted data
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::CorruptFormat { .. } | Error::CorruptIndex { .. }
        )
    }
}
