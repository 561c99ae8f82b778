//! Builder error types.

use thiserror::Error;
use vista_core::TypeError;

/// Errors raised while building or validating templates.
#[derive(Debug, Error)]
pub enum BuilderError {
    /// Payload could not be decoded at all.
    #[error("decode error: {0}")]
    Decode(String),

    /// Structural validation failed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A template placeholder survived into the submission.
    #[error("{0}")]
    Placeholder(String),

    /// Domain-type construction failure (includes unknown fact kinds).
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Result type for builder operations.
pub type BuilderResult<T> = Result<T, BuilderError>;
