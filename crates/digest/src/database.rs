//! Read-side query engine and watermark owner.
//!
//! All queries are synchronous sqlite reads through the store's pool; the
//! async layers above call them directly, the same layering the rest of
//! the node uses for its chain index. "Not found" is always the explicit
//! `Ok(None)`/empty outcome, never an error.

use std::str::FromStr;
use std::sync::Arc;

use alloy_primitives::B256;
use parking_lot::RwLock;
use rusqlite::types::Value as SqlValue;
use vista_core::{Address, Amount, CurrencyId, Height, Manifest};

use crate::cursor::{HeightCursor, OperationCursor};
use crate::error::{DigestError, DigestResult};
use crate::metrics::DigestMetrics;
use crate::store::DigestStore;
use crate::types::{AccountRecord, AccountValue, CurrencyValue, OperationRef, OperationValue};

/// Hard ceiling on rows per list query.
pub const MAX_LIMIT: i64 = 50;

/// Filter for general-purpose operation listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationsFilter {
    /// Every indexed operation.
    All,
    /// Operations confirmed at one height.
    AtHeight(Height),
}

/// The query engine over the digest collections.
pub struct Database {
    store: DigestStore,
    watermark: RwLock<Height>,
    read_only: bool,
    metrics: Arc<DigestMetrics>,
}

impl Database {
    pub fn new(store: DigestStore, read_only: bool) -> Self {
        Database {
            store,
            watermark: RwLock::new(Height::NIL),
            read_only,
            metrics: Arc::new(DigestMetrics::default()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<DigestMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    pub(crate) fn store(&self) -> &DigestStore {
        &self.store
    }

    pub(crate) fn metrics(&self) -> &DigestMetrics {
        &self.metrics
    }

    pub(crate) fn assert_writable(&self) -> DigestResult<()> {
        if self.read_only {
            return Err(DigestError::ReadOnly);
        }
        Ok(())
    }

    /// Load the persisted watermark and, unless read-only, discard any
    /// partially-written tail above it left behind by a crash.
    pub fn initialize(&self) -> DigestResult<()> {
        match self.store.load_last_block()? {
            Some(height) => {
                *self.watermark.write() = height;
                tracing::info!(%height, "digest database initialized");
                if !self.read_only {
                    self.clean_by_height(height.next())?;
                }
            }
            None => {
                *self.watermark.write() = Height::NIL;
                tracing::info!("digest database initialized (empty)");
            }
        }
        Ok(())
    }

    // ---- watermark ----

    /// The highest height fully reflected in the read-model.
    pub fn last_block(&self) -> Height {
        *self.watermark.read()
    }

    /// Advance the watermark. A no-op (returning `false`) unless `height`
    /// is strictly greater than the current value.
    pub fn set_last_block(&self, height: Height) -> DigestResult<bool> {
        self.assert_writable()?;
        let mut wm = self.watermark.write();
        if height <= *wm {
            return Ok(false);
        }
        self.store.store_last_block(height)?;
        *wm = height;
        Ok(true)
    }

    fn force_last_block(&self, height: Height) -> DigestResult<()> {
        let mut wm = self.watermark.write();
        self.store.store_last_block(height)?;
        *wm = height;
        Ok(())
    }

    // ---- destructive cleanup ----

    /// Drop every document and reset the watermark to `NIL`.
    pub fn clean(&self) -> DigestResult<()> {
        self.assert_writable()?;
        self.store.delete_all()?;
        self.force_last_block(Height::NIL)?;
        tracing::info!("digest database cleaned");
        Ok(())
    }

    /// Remove all documents at `height` or above and move the watermark to
    /// `height - 1`. At or below genesis this is a full clean.
    pub fn clean_by_height(&self, height: Height) -> DigestResult<()> {
        self.assert_writable()?;
        if height <= Height::GENESIS {
            return self.clean();
        }
        self.store.delete_from_height(height)?;
        self.force_last_block(height.prev())?;
        tracing::info!(%height, "digest documents cleaned from height");
        Ok(())
    }

    // ---- accounts and balances ----

    /// The most-recent account projection merged with its aggregated
    /// balances.
    pub fn account(&self, address: &Address) -> DigestResult<Option<AccountValue>> {
        let conn = self.store.read_conn()?;
        let result: rusqlite::Result<String> = conn.query_row(
            "SELECT doc FROM accounts WHERE address = ? ORDER BY height DESC LIMIT 1",
            rusqlite::params![address.as_str()],
            |row| row.get(0),
        );
        let record: AccountRecord = match result {
            Ok(doc) => serde_json::from_str(&doc)?,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        drop(conn);

        let (balances, last, previous) = self.balance(address)?;
        let height = if last.is_nil() {
            record.height
        } else {
            record.height.max(last)
        };
        Ok(Some(AccountValue {
            address: record.address,
            keys: record.keys,
            balances,
            height,
            previous_height: previous,
        }))
    }

    /// Aggregate the most-recent balance per distinct currency.
    ///
    /// Queried iteratively — newest document among the currencies not yet
    /// seen, until no new currency id turns up — so one currency's later
    /// update can never mask another currency's balance. Returns the
    /// amounts plus the overall (latest, previous) height pair.
    pub fn balance(&self, address: &Address) -> DigestResult<(Vec<Amount>, Height, Height)> {
        let conn = self.store.read_conn()?;
        let mut amounts: Vec<Amount> = Vec::new();
        let mut heights: Vec<Height> = Vec::new();
        let mut seen: Vec<String> = Vec::new();

        loop {
            let mut sql = String::from("SELECT doc FROM balances WHERE address = ?");
            let mut values: Vec<SqlValue> = vec![SqlValue::from(address.as_str().to_string())];
            if !seen.is_empty() {
                let placeholders = vec!["?"; seen.len()].join(", ");
                sql.push_str(&format!(" AND currency NOT IN ({placeholders})"));
                values.extend(seen.iter().cloned().map(SqlValue::from));
            }
            sql.push_str(" ORDER BY height DESC, currency ASC LIMIT 1");

            let result: rusqlite::Result<String> =
                conn.query_row(&sql, rusqlite::params_from_iter(values), |row| row.get(0));
            let doc = match result {
                Ok(doc) => doc,
                Err(rusqlite::Error::QueryReturnedNoRows) => break,
                Err(e) => return Err(e.into()),
            };
            let record: crate::types::BalanceRecord = serde_json::from_str(&doc)?;
            seen.push(record.currency.as_str().to_string());
            heights.push(record.height);
            amounts.push(Amount::new(record.currency, record.amount));
        }

        let last = heights.iter().copied().max().unwrap_or(Height::NIL);
        let previous = heights
            .iter()
            .copied()
            .filter(|h| *h < last)
            .max()
            .unwrap_or(Height::NIL);
        Ok((amounts, last, previous))
    }

    // ---- operations ----

    /// Walk operations touching `address`, ordered by `(height, index)`.
    ///
    /// The offset cursor is exclusive: strictly greater going forward,
    /// strictly less in reverse. `load = false` skips document decode and
    /// hands back fact hashes only. The callback returns `false` to stop.
    pub fn operations_by_address<F>(
        &self,
        address: &Address,
        load: bool,
        reverse: bool,
        offset: Option<OperationCursor>,
        limit: i64,
        f: F,
    ) -> DigestResult<()>
    where
        F: FnMut(OperationRef) -> DigestResult<bool>,
    {
        let select = if load {
            "o.height, o.op_index, o.fact_hash, o.doc"
        } else {
            "o.height, o.op_index, o.fact_hash"
        };
        let mut sql = format!(
            "SELECT {select} FROM operation_addresses a \
             JOIN operations o ON o.height = a.height AND o.op_index = a.op_index \
             WHERE a.address = ?1"
        );
        let mut values: Vec<SqlValue> = vec![SqlValue::from(address.as_str().to_string())];
        push_cursor_clause(&mut sql, &mut values, "o.height", "o.op_index", offset, reverse);
        push_order_limit(&mut sql, &mut values, "o.height", "o.op_index", reverse, limit);

        self.walk_operations(&sql, values, load, f)
    }

    /// Walk operations matching `filter`, ordered by `(height, index)`.
    pub fn operations<F>(
        &self,
        filter: OperationsFilter,
        load: bool,
        reverse: bool,
        offset: Option<OperationCursor>,
        limit: i64,
        f: F,
    ) -> DigestResult<()>
    where
        F: FnMut(OperationRef) -> DigestResult<bool>,
    {
        let select = if load {
            "height, op_index, fact_hash, doc"
        } else {
            "height, op_index, fact_hash"
        };
        let mut sql = format!("SELECT {select} FROM operations WHERE 1=1");
        let mut values: Vec<SqlValue> = Vec::new();
        if let OperationsFilter::AtHeight(h) = filter {
            values.push(SqlValue::from(h.as_i64()));
            sql.push_str(&format!(" AND height = ?{}", values.len()));
        }
        push_cursor_clause(&mut sql, &mut values, "height", "op_index", offset, reverse);
        push_order_limit(&mut sql, &mut values, "height", "op_index", reverse, limit);

        self.walk_operations(&sql, values, load, f)
    }

    /// Look up one operation by fact hash. The same fact hash may recur
    /// across heights on resubmission; the newest confirmation wins.
    pub fn operation(&self, fact_hash: &B256, load: bool) -> DigestResult<Option<OperationRef>> {
        let select = if load {
            "height, op_index, fact_hash, doc"
        } else {
            "height, op_index, fact_hash"
        };
        let sql = format!(
            "SELECT {select} FROM operations WHERE fact_hash = ? \
             ORDER BY height DESC, op_index DESC LIMIT 1"
        );

        let mut found = None;
        self.walk_operations(
            &sql,
            vec![SqlValue::from(fact_hash.to_string())],
            load,
            |r| {
                found = Some(r);
                Ok(false)
            },
        )?;
        Ok(found)
    }

    fn walk_operations<F>(
        &self,
        sql: &str,
        values: Vec<SqlValue>,
        load: bool,
        mut f: F,
    ) -> DigestResult<()>
    where
        F: FnMut(OperationRef) -> DigestResult<bool>,
    {
        let conn = self.store.read_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query(rusqlite::params_from_iter(values))?;
        while let Some(row) = rows.next()? {
            let height: i64 = row.get(0)?;
            let index: i64 = row.get(1)?;
            let fact_hash: String = row.get(2)?;
            let value: Option<OperationValue> = if load {
                let doc: String = row.get(3)?;
                Some(serde_json::from_str(&doc)?)
            } else {
                None
            };
            let record = OperationRef {
                height: Height::new(height),
                index: index as u32,
                fact_hash: parse_hash(&fact_hash)?,
                value,
            };
            if !f(record)? {
                break;
            }
        }
        Ok(())
    }

    // ---- manifests ----

    /// Walk stored manifests ordered by height. The offset compares the
    /// height alone — manifest lists have no secondary key.
    pub fn manifests<F>(
        &self,
        load: bool,
        reverse: bool,
        offset: Option<HeightCursor>,
        limit: i64,
        mut f: F,
    ) -> DigestResult<()>
    where
        F: FnMut(Height, Option<Manifest>) -> DigestResult<bool>,
    {
        let select = if load { "height, doc" } else { "height" };
        let cmp = if reverse { "<" } else { ">" };
        let dir = if reverse { "DESC" } else { "ASC" };

        let mut sql = format!("SELECT {select} FROM manifests WHERE 1=1");
        let mut values: Vec<SqlValue> = Vec::new();
        if let Some(HeightCursor(h)) = offset {
            values.push(SqlValue::from(h.as_i64()));
            sql.push_str(&format!(" AND height {cmp} ?{}", values.len()));
        }
        values.push(SqlValue::from(clamp_limit(limit)));
        sql.push_str(&format!(" ORDER BY height {dir} LIMIT ?{}", values.len()));

        let conn = self.store.read_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(rusqlite::params_from_iter(values))?;
        while let Some(row) = rows.next()? {
            let height: i64 = row.get(0)?;
            let manifest: Option<Manifest> = if load {
                let doc: String = row.get(1)?;
                Some(serde_json::from_str(&doc)?)
            } else {
                None
            };
            if !f(Height::new(height), manifest)? {
                break;
            }
        }
        Ok(())
    }

    pub fn manifest(&self, height: Height) -> DigestResult<Option<Manifest>> {
        let conn = self.store.read_conn()?;
        let result: rusqlite::Result<String> = conn.query_row(
            "SELECT doc FROM manifests WHERE height = ?",
            rusqlite::params![height.as_i64()],
            |row| row.get(0),
        );
        decode_optional(result)
    }

    pub fn manifest_by_hash(&self, hash: &B256) -> DigestResult<Option<Manifest>> {
        let conn = self.store.read_conn()?;
        let result: rusqlite::Result<String> = conn.query_row(
            "SELECT doc FROM manifests WHERE hash = ?",
            rusqlite::params![hash.to_string()],
            |row| row.get(0),
        );
        decode_optional(result)
    }

    // ---- currencies ----

    /// The live design for one currency id.
    pub fn currency(&self, id: &CurrencyId) -> DigestResult<Option<CurrencyValue>> {
        let conn = self.store.read_conn()?;
        let result: rusqlite::Result<String> = conn.query_row(
            "SELECT doc FROM currencies WHERE currency = ? ORDER BY height DESC LIMIT 1",
            rusqlite::params![id.as_str()],
            |row| row.get(0),
        );
        decode_optional(result)
    }

    /// The live design of every known currency, ordered by id.
    pub fn currencies(&self) -> DigestResult<Vec<CurrencyValue>> {
        let conn = self.store.read_conn()?;
        let mut stmt = conn.prepare(
            "SELECT c.doc FROM currencies c \
             JOIN (SELECT currency, MAX(height) AS h FROM currencies GROUP BY currency) live \
               ON c.currency = live.currency AND c.height = live.h \
             ORDER BY c.currency ASC",
        )?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let doc: String = row.get(0)?;
            out.push(serde_json::from_str(&doc)?);
        }
        Ok(out)
    }
}

fn decode_optional<T: serde::de::DeserializeOwned>(
    result: rusqlite::Result<String>,
) -> DigestResult<Option<T>> {
    match result {
        Ok(doc) => Ok(Some(serde_json::from_str(&doc)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn parse_hash(s: &str) -> DigestResult<B256> {
    B256::from_str(s).map_err(|e| DigestError::Serialization(format!("bad hash {s}: {e}")))
}

fn clamp_limit(limit: i64) -> i64 {
    if limit <= 0 {
        -1 // sqlite: no limit
    } else {
        limit.min(MAX_LIMIT)
    }
}

fn push_cursor_clause(
    sql: &mut String,
    values: &mut Vec<SqlValue>,
    height_col: &str,
    index_col: &str,
    offset: Option<OperationCursor>,
    reverse: bool,
) {
    let cmp = if reverse { "<" } else { ">" };
    if let Some(c) = offset {
        values.push(SqlValue::from(c.height.as_i64()));
        let h = values.len();
        values.push(SqlValue::from(c.index as i64));
        let i = values.len();
        sql.push_str(&format!(
            " AND ({height_col} {cmp} ?{h} OR ({height_col} = ?{h} AND {index_col} {cmp} ?{i}))"
        ));
    }
}

fn push_order_limit(
    sql: &mut String,
    values: &mut Vec<SqlValue>,
    height_col: &str,
    index_col: &str,
    reverse: bool,
    limit: i64,
) {
    let dir = if reverse { "DESC" } else { "ASC" };
    values.push(SqlValue::from(clamp_limit(limit)));
    sql.push_str(&format!(
        " ORDER BY {height_col} {dir}, {index_col} {dir} LIMIT ?{}",
        values.len()
    ));
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::atomic::{AtomicU64, Ordering};

    use chrono::{TimeZone, Utc};
    use vista_core::{
        Address, Amount, Big, Block, CurrencyId, Fact, FactSign, Manifest, Operation,
        OperationOutcome, OperationTree, Publickey, Signature, StateDiff, TransferFact,
        TransferItem,
    };

    use super::*;

    fn next_token() -> String {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        format!("tok-{}", COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    pub fn vst() -> CurrencyId {
        CurrencyId::new("VST").unwrap()
    }

    /// A transfer operation with a unique token, so hashes never collide.
    pub fn make_operation(sender: &str, receiver: &str, amount: u128) -> Operation {
        let fact = Fact::Transfer(TransferFact {
            token: next_token(),
            sender: addr(sender),
            items: vec![TransferItem {
                receiver: addr(receiver),
                amounts: vec![Amount::new(vst(), Big::new(amount))],
            }],
        });
        let sign = FactSign::new(
            Publickey::new("signer1:vpb").unwrap(),
            Signature::new("sig1").unwrap(),
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        );
        Operation::new(fact, vec![sign])
    }

    /// A finalized block whose tree marks every operation in-state.
    pub fn make_block(height: i64, operations: Vec<Operation>, diffs: Vec<StateDiff>) -> Block {
        let mut tree = OperationTree::new();
        for op in &operations {
            tree.insert(
                op.fact_hash(),
                OperationOutcome {
                    in_state: true,
                    reason: None,
                },
            );
        }
        Block {
            manifest: Manifest {
                height: Height::new(height),
                hash: B256::repeat_byte(height as u8),
                parent: B256::repeat_byte(height.saturating_sub(1) as u8),
                operations_tree_root: B256::repeat_byte(0xaa),
                states_root: B256::repeat_byte(0xbb),
                proposed_at: Utc.timestamp_opt(1_700_000_000 + height, 0).unwrap(),
            },
            operations,
            tree,
            diffs,
        }
    }

    pub fn vst_balance_diff(address: &str, amount: u128) -> StateDiff {
        StateDiff::Balance {
            address: addr(address),
            amount: Amount::new(vst(), Big::new(amount)),
        }
    }

    pub fn digest_block(db: &Database, block: Block) {
        let height = block.height();
        let mut session = crate::session::BlockSession::new(db, block);
        session.prepare().unwrap();
        session.commit().unwrap();
        let _ = db.set_last_block(height).unwrap();
    }
}
