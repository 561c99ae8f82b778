//! Per-block ingestion session.
//!
//! A session projects exactly one finalized block into the store.
//! `prepare()` builds every document in memory; `commit()` clears the
//! block's height and bulk-writes the documents phase by phase. Sessions
//! are cheap to discard: a failed commit is remediated by cleaning the
//! height and running a fresh session.

use std::time::Instant;

use vista_core::{Block, StateDiff};

use crate::database::Database;
use crate::error::{DigestError, DigestResult};
use crate::types::{AccountRecord, BalanceRecord, CurrencyValue, OperationValue};

struct PreparedDocs {
    operations: Vec<OperationValue>,
    accounts: Vec<AccountRecord>,
    balances: Vec<BalanceRecord>,
    currencies: Vec<CurrencyValue>,
}

/// Projects one finalized block into the document store.
pub struct BlockSession<'a> {
    database: &'a Database,
    block: Block,
    prepared: Option<PreparedDocs>,
}

impl<'a> BlockSession<'a> {
    pub fn new(database: &'a Database, block: Block) -> Self {
        BlockSession {
            database,
            block,
            prepared: None,
        }
    }

    /// Build all projection documents in memory.
    ///
    /// Fails if an operation's fact hash is absent from the block's
    /// operation tree: that is a structural inconsistency in the input, not
    /// something a retry can fix.
    pub fn prepare(&mut self) -> DigestResult<()> {
        let height = self.block.height();
        let confirmed_at = self.block.manifest.proposed_at;

        let mut operations = Vec::with_capacity(self.block.operations.len());
        for (index, operation) in self.block.operations.iter().enumerate() {
            let fact_hash = operation.fact_hash();
            let outcome =
                self.block
                    .tree
                    .get(&fact_hash)
                    .ok_or_else(|| DigestError::Inconsistent {
                        height,
                        reason: format!("fact {fact_hash} not in operation tree"),
                    })?;
            operations.push(OperationValue {
                operation: operation.clone(),
                height,
                confirmed_at,
                in_state: outcome.in_state,
                reason: outcome.reason.clone(),
                index: index as u32,
            });
        }

        let mut accounts = Vec::new();
        let mut balances = Vec::new();
        let mut currencies = Vec::new();
        for diff in &self.block.diffs {
            match diff {
                StateDiff::Account { address, keys } => accounts.push(AccountRecord {
                    address: address.clone(),
                    keys: keys.clone(),
                    height,
                }),
                StateDiff::Balance { address, amount } => balances.push(BalanceRecord {
                    address: address.clone(),
                    currency: amount.currency.clone(),
                    amount: amount.big,
                    height,
                }),
                StateDiff::Currency { design } => currencies.push(CurrencyValue {
                    design: design.clone(),
                    height,
                }),
            }
        }

        self.prepared = Some(PreparedDocs {
            operations,
            accounts,
            balances,
            currencies,
        });
        Ok(())
    }

    /// Clear the block's height, then bulk-write all prepared documents.
    ///
    /// Returns the first write error; a partial commit is left behind in
    /// that case and is cleaned up by the next run of the same height.
    pub fn commit(&mut self) -> DigestResult<()> {
        self.database.assert_writable()?;
        let height = self.block.height();
        let docs = self.prepared.take().ok_or_else(|| DigestError::Digest {
            height,
            message: "commit before prepare".into(),
        })?;

        let store = self.database.store();
        let metrics = self.database.metrics();
        let commit_started = Instant::now();

        let phase = Instant::now();
        store.delete_at_height(height)?;
        tracing::debug!(height = %height, elapsed = ?phase.elapsed(), "cleared height");

        let phase = Instant::now();
        let ops = store.insert_operations(&docs.operations)?;
        tracing::debug!(height = %height, rows = ops, elapsed = ?phase.elapsed(), "wrote operations");

        let phase = Instant::now();
        let accounts = store.insert_accounts(&docs.accounts)?;
        tracing::debug!(height = %height, rows = accounts, elapsed = ?phase.elapsed(), "wrote accounts");

        let phase = Instant::now();
        let balances = store.insert_balances(&docs.balances)?;
        tracing::debug!(height = %height, rows = balances, elapsed = ?phase.elapsed(), "wrote balances");

        let phase = Instant::now();
        let currencies = store.insert_currencies(&docs.currencies)?;
        tracing::debug!(height = %height, rows = currencies, elapsed = ?phase.elapsed(), "wrote currencies");

        store.insert_manifest(&self.block.manifest)?;

        metrics.commit_latency_seconds
            .observe(commit_started.elapsed().as_secs_f64());
        metrics
            .documents_written
            .inc_by((ops + accounts + balances + currencies + 1) as u64);
        Ok(())
    }
}
