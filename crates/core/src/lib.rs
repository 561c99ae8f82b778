//! Domain types for the vista read-model.
//!
//! This crate holds the currency-chain vocabulary shared by the digest
//! pipeline, the operation builder and the HTTP surface: addresses and
//! weighted signing keys, amounts and currency designs, the closed set of
//! operation facts with their canonical byte forms, and the finalized-block
//! input types handed over by the consensus engine.
//!
//! Cryptographic key and signature *verification* is an external concern;
//! the types here enforce structure only, and the [`SignatureVerifier`]
//! trait is the seam a real implementation plugs into.

pub mod address;
pub mod amount;
pub mod block;
pub mod currency;
pub mod error;
pub mod fact;
pub mod height;
pub mod keys;
pub mod network;
pub mod operation;
pub mod registry;

pub use address::Address;
pub use amount::{Amount, Big, CurrencyId};
pub use block::{Block, Manifest, NodeInfo, OperationOutcome, OperationTree, StateDiff};
pub use currency::{CurrencyDesign, CurrencyPolicy, FeePolicy};
pub use error::TypeError;
pub use fact::{
    CreateAccountFact, CreateAccountItem, CurrencyPolicyUpdateFact, CurrencyRegisterFact, Fact,
    FactKind, KeyUpdateFact, TransferFact, TransferItem,
};
pub use height::Height;
pub use keys::{AccountKey, Keys, Publickey, Signature};
pub use network::NetworkId;
pub use operation::{AcceptAll, FactSign, Operation, SignatureVerifier};
pub use registry::FactRegistry;

/// Re-exported 32-byte hash type used for fact and block hashes.
pub use alloy_primitives::B256;

/// Result alias for fallible type constructors and validation.
pub type TypeResult<T> = Result<T, TypeError>;
