//! Error type for domain-type construction and validation.

use thiserror::Error;

/// Errors produced when constructing or validating domain types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    /// Malformed address string.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Malformed public key string.
    #[error("invalid public key: {0}")]
    InvalidPublickey(String),

    /// Malformed signature.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Malformed currency id.
    #[error("invalid currency id: {0}")]
    InvalidCurrencyId(String),

    /// Malformed amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Malformed height.
    #[error("invalid height: {0}")]
    InvalidHeight(String),

    /// Signing-policy key set failed validation.
    #[error("invalid keys: {0}")]
    InvalidKeys(String),

    /// Currency design or policy failed validation.
    #[error("invalid currency design: {0}")]
    InvalidCurrency(String),

    /// Fact failed structural validation.
    #[error("invalid fact: {0}")]
    InvalidFact(String),

    /// Operation failed structural validation.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Network id must be non-empty.
    #[error("invalid network id")]
    InvalidNetworkId,

    /// Type tag not present in the fact registry.
    #[error("unknown operation: {0}")]
    UnknownFactKind(String),

    /// Payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}
