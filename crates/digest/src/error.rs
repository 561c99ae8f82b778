//! Error types for digest operations.

use thiserror::Error;
use vista_core::Height;

/// Errors that can occur while ingesting or querying the read-model.
#[derive(Debug, Error)]
pub enum DigestError {
    /// Mutating call against a read-only database. Never retried.
    #[error("database is read-only")]
    ReadOnly,

    /// Document-store driver failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// A stored or in-flight document could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Malformed pagination cursor.
    #[error("invalid cursor: {0}")]
    Cursor(String),

    /// A block's contents disagree with its operation tree.
    #[error("inconsistent block at height {height}: {reason}")]
    Inconsistent { height: Height, reason: String },

    /// Terminal ingestion failure for one height, after retries.
    #[error("digest of height {height} failed: {message}")]
    Digest { height: Height, message: String },

    /// The digester no longer accepts blocks.
    #[error("digester stopped")]
    Stopped,
}

impl From<rusqlite::Error> for DigestError {
    fn from(err: rusqlite::Error) -> Self {
        DigestError::Storage(err.to_string())
    }
}

impl From<r2d2::Error> for DigestError {
    fn from(err: r2d2::Error) -> Self {
        DigestError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for DigestError {
    fn from(err: serde_json::Error) -> Self {
        DigestError::Serialization(err.to_string())
    }
}

/// Result type for digest operations.
pub type DigestResult<T> = Result<T, DigestError>;
