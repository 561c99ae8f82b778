//! Finalized-block input types.
//!
//! These are the shapes the external consensus engine hands to the digest
//! pipeline: a manifest, the ordered operation list, the operation-tree
//! outcomes and the block's state diffs. The digest never validates
//! finality; it trusts what it is given.

use std::collections::HashMap;

use alloy_primitives::B256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::amount::Amount;
use crate::currency::CurrencyDesign;
use crate::height::Height;
use crate::keys::Keys;
use crate::operation::Operation;

/// Block header summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub height: Height,
    pub hash: B256,
    pub parent: B256,
    pub operations_tree_root: B256,
    pub states_root: B256,
    pub proposed_at: DateTime<Utc>,
}

/// Outcome of one operation in the operation tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationOutcome {
    /// Whether the operation produced a ledger-state effect.
    pub in_state: bool,
    /// Rejection reason when it did not.
    pub reason: Option<String>,
}

/// Map of fact hash to processing outcome for one block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationTree {
    nodes: HashMap<B256, OperationOutcome>,
}

impl OperationTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, fact_hash: B256, outcome: OperationOutcome) {
        self.nodes.insert(fact_hash, outcome);
    }

    pub fn get(&self, fact_hash: &B256) -> Option<&OperationOutcome> {
        self.nodes.get(fact_hash)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// One entry of a block's state-diff set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StateDiff {
    /// An account's signing policy was created or replaced.
    Account { address: Address, keys: Keys },
    /// A balance entry changed.
    Balance { address: Address, amount: Amount },
    /// A currency design was registered or its policy updated.
    Currency { design: CurrencyDesign },
}

/// A finalized block as consumed by the digest pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub manifest: Manifest,
    pub operations: Vec<Operation>,
    pub tree: OperationTree,
    pub diffs: Vec<StateDiff>,
}

impl Block {
    pub fn height(&self) -> Height {
        self.manifest.height
    }
}

/// Aggregated node description served at the API root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub network: String,
    pub version: String,
    pub last_block: Option<Manifest>,
}
