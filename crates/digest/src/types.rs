//! Projection document types.
//!
//! Denormalized, query-friendly views derived from raw ledger state and
//! operations. These are what the store persists and the HTTP surface
//! embeds; they are distinct from the consensus-facing input types in
//! `vista_core`.

use alloy_primitives::B256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vista_core::{Address, Amount, Big, CurrencyDesign, CurrencyId, Height, Keys, Operation};

/// Projection of one account's latest known state.
///
/// At most one balance entry per currency id; `height` is the latest update
/// across the account record and its balances, `previous_height` the update
/// before that (`NIL` when there was none).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountValue {
    pub address: Address,
    pub keys: Keys,
    pub balances: Vec<Amount>,
    pub height: Height,
    pub previous_height: Height,
}

/// Stored account document: the state-diff entry as written at one height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub address: Address,
    pub keys: Keys,
    pub height: Height,
}

/// Stored balance document: one currency's balance at one height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceRecord {
    pub address: Address,
    pub currency: CurrencyId,
    pub amount: Big,
    pub height: Height,
}

/// Projection of one processed operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationValue {
    pub operation: Operation,
    pub height: Height,
    pub confirmed_at: DateTime<Utc>,
    /// Whether the operation produced a ledger-state effect.
    pub in_state: bool,
    /// Rejection reason when it did not.
    pub reason: Option<String>,
    /// Position within the block's operation list.
    pub index: u32,
}

impl OperationValue {
    pub fn fact_hash(&self) -> B256 {
        self.operation.fact_hash()
    }
}

/// A row handed to operation-list callbacks. `value` is only present in
/// full-load mode; projection-only queries carry the fact hash alone.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRef {
    pub height: Height,
    pub index: u32,
    pub fact_hash: B256,
    pub value: Option<OperationValue>,
}

/// A currency design as of one height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyValue {
    pub design: CurrencyDesign,
    pub height: Height,
}
