//! Sqlite-backed document store for the digest collections.
//!
//! Uses a connection pool for concurrent reads and a dedicated writer
//! connection for serialized writes; WAL mode lets readers proceed without
//! blocking the writer. All collections are keyed by height so cleanup for
//! a re-run or a rollback is a range delete.

use std::sync::Mutex;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection};
use vista_core::{Height, Manifest};

use crate::error::{DigestError, DigestResult};
use crate::types::{AccountRecord, BalanceRecord, CurrencyValue, OperationValue};

/// Upper bound on rows per bulk-write request.
pub const WRITE_CHUNK: usize = 500;

const LAST_BLOCK_KEY: &str = "last_block";

/// The persistent document store.
pub struct DigestStore {
    read_pool: Pool<SqliteConnectionManager>,
    writer: Mutex<Connection>,
}

/// Configure a connection with standard PRAGMAs for WAL mode.
fn configure_connection(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous=NORMAL;",
    )
}

impl DigestStore {
    /// Open an on-disk store, creating the schema if needed.
    pub fn open(db_path: impl AsRef<std::path::Path>) -> DigestResult<Self> {
        let writer = Connection::open(&db_path)?;
        configure_connection(&writer)?;

        let manager = SqliteConnectionManager::file(&db_path)
            .with_flags(
                rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .with_init(|conn| configure_connection(conn));
        let read_pool = Pool::builder()
            .max_size(4)
            .build(manager)
            .map_err(|e| DigestError::Storage(e.to_string()))?;

        let store = DigestStore {
            read_pool,
            writer: Mutex::new(writer),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// In-memory store for tests, via a named shared-cache database so the
    /// read pool and the writer see the same data.
    pub fn in_memory() -> DigestResult<Self> {
        let uri = format!("file:digest_{}?mode=memory&cache=shared", unique_id());
        let writer = Connection::open(&uri)?;
        configure_connection(&writer)?;

        let manager =
            SqliteConnectionManager::file(&uri).with_init(|conn| configure_connection(conn));
        let read_pool = Pool::builder()
            .max_size(2)
            .build(manager)
            .map_err(|e| DigestError::Storage(e.to_string()))?;

        let store = DigestStore {
            read_pool,
            writer: Mutex::new(writer),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Get a read connection from the pool.
    pub(crate) fn read_conn(
        &self,
    ) -> DigestResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.read_pool
            .get()
            .map_err(|e| DigestError::Storage(e.to_string()))
    }

    fn init_schema(&self) -> DigestResult<()> {
        let conn = self.writer.lock().unwrap();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS operations (
                 fact_hash TEXT NOT NULL,
                 height INTEGER NOT NULL,
                 op_index INTEGER NOT NULL,
                 in_state INTEGER NOT NULL,
                 doc TEXT NOT NULL,
                 PRIMARY KEY (height, op_index)
             );
             CREATE INDEX IF NOT EXISTS idx_operations_fact ON operations(fact_hash);

             CREATE TABLE IF NOT EXISTS operation_addresses (
                 address TEXT NOT NULL,
                 height INTEGER NOT NULL,
                 op_index INTEGER NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_opaddr_address
                 ON operation_addresses(address, height, op_index);
             CREATE INDEX IF NOT EXISTS idx_opaddr_height ON operation_addresses(height);

             CREATE TABLE IF NOT EXISTS accounts (
                 address TEXT NOT NULL,
                 height INTEGER NOT NULL,
                 doc TEXT NOT NULL,
                 PRIMARY KEY (address, height)
             );
             CREATE INDEX IF NOT EXISTS idx_accounts_height ON accounts(height);

             CREATE TABLE IF NOT EXISTS balances (
                 address TEXT NOT NULL,
                 currency TEXT NOT NULL,
                 height INTEGER NOT NULL,
                 amount TEXT NOT NULL,
                 doc TEXT NOT NULL,
                 PRIMARY KEY (address, currency, height)
             );
             CREATE INDEX IF NOT EXISTS idx_balances_height ON balances(height);
             CREATE INDEX IF NOT EXISTS idx_balances_addr ON balances(address, height);

             CREATE TABLE IF NOT EXISTS currencies (
                 currency TEXT NOT NULL,
                 height INTEGER NOT NULL,
                 doc TEXT NOT NULL,
                 PRIMARY KEY (currency, height)
             );
             CREATE INDEX IF NOT EXISTS idx_currencies_height ON currencies(height);

             CREATE TABLE IF NOT EXISTS manifests (
                 height INTEGER PRIMARY KEY,
                 hash TEXT NOT NULL,
                 doc TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_manifests_hash ON manifests(hash);

             CREATE TABLE IF NOT EXISTS metadata (
                 key TEXT PRIMARY KEY,
                 value TEXT NOT NULL
             );",
        )?;
        Ok(())
    }

    // ---- watermark ----

    pub(crate) fn load_last_block(&self) -> DigestResult<Option<Height>> {
        let conn = self.read_conn()?;
        let result: rusqlite::Result<i64> = conn.query_row(
            "SELECT CAST(value AS INTEGER) FROM metadata WHERE key = ?",
            params![LAST_BLOCK_KEY],
            |row| row.get(0),
        );
        match result {
            Ok(v) => Ok(Some(Height::new(v))),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) fn store_last_block(&self, height: Height) -> DigestResult<()> {
        let conn = self.writer.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?, ?)",
            params![LAST_BLOCK_KEY, height.as_i64().to_string()],
        )?;
        Ok(())
    }

    // ---- destructive cleanup ----

    /// Remove every document at exactly `height`. Runs before the inserts
    /// of a block session so re-running a block is idempotent.
    pub(crate) fn delete_at_height(&self, height: Height) -> DigestResult<()> {
        self.delete_where("=", height)
    }

    /// Remove every document at `height` or above (reorg rollback).
    pub(crate) fn delete_from_height(&self, height: Height) -> DigestResult<()> {
        self.delete_where(">=", height)
    }

    fn delete_where(&self, op: &str, height: Height) -> DigestResult<()> {
        let mut guard = self.writer.lock().unwrap();
        let conn = &mut *guard;
        let tx = conn.transaction()?;
        for table in [
            "operation_addresses",
            "operations",
            "accounts",
            "balances",
            "currencies",
            "manifests",
        ] {
            tx.execute(
                &format!("DELETE FROM {table} WHERE height {op} ?"),
                params![height.as_i64()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Drop all documents and the watermark (full reset).
    pub(crate) fn delete_all(&self) -> DigestResult<()> {
        let mut guard = self.writer.lock().unwrap();
        let conn = &mut *guard;
        let tx = conn.transaction()?;
        for table in [
            "operation_addresses",
            "operations",
            "accounts",
            "balances",
            "currencies",
            "manifests",
            "metadata",
        ] {
            tx.execute(&format!("DELETE FROM {table}"), [])?;
        }
        tx.commit()?;
        Ok(())
    }

    // ---- bulk inserts ----

    /// Insert operation documents and their address rows, chunked.
    pub(crate) fn insert_operations(&self, docs: &[OperationValue]) -> DigestResult<usize> {
        let mut written = 0;
        let mut guard = self.writer.lock().unwrap();
        let conn = &mut *guard;
        for chunk in docs.chunks(WRITE_CHUNK) {
            let tx = conn.transaction()?;
            {
                let mut op_stmt = tx.prepare_cached(
                    "INSERT OR REPLACE INTO operations
                     (fact_hash, height, op_index, in_state, doc)
                     VALUES (?, ?, ?, ?, ?)",
                )?;
                let mut addr_stmt = tx.prepare_cached(
                    "INSERT INTO operation_addresses (address, height, op_index)
                     VALUES (?, ?, ?)",
                )?;
                for doc in chunk {
                    let json = serde_json::to_string(doc)?;
                    op_stmt.execute(params![
                        doc.fact_hash().to_string(),
                        doc.height.as_i64(),
                        doc.index,
                        doc.in_state,
                        json,
                    ])?;
                    for address in doc.operation.fact.addresses() {
                        addr_stmt.execute(params![
                            address.as_str(),
                            doc.height.as_i64(),
                            doc.index,
                        ])?;
                    }
                }
            }
            tx.commit()?;
            written += chunk.len();
        }
        Ok(written)
    }

    pub(crate) fn insert_accounts(&self, docs: &[AccountRecord]) -> DigestResult<usize> {
        self.insert_chunked(docs, |tx, chunk| {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO accounts (address, height, doc) VALUES (?, ?, ?)",
            )?;
            for doc in chunk {
                let json = serde_json::to_string(doc)?;
                stmt.execute(params![doc.address.as_str(), doc.height.as_i64(), json])?;
            }
            Ok(())
        })
    }

    pub(crate) fn insert_balances(&self, docs: &[BalanceRecord]) -> DigestResult<usize> {
        self.insert_chunked(docs, |tx, chunk| {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO balances (address, currency, height, amount, doc)
                 VALUES (?, ?, ?, ?, ?)",
            )?;
            for doc in chunk {
                let json = serde_json::to_string(doc)?;
                stmt.execute(params![
                    doc.address.as_str(),
                    doc.currency.as_str(),
                    doc.height.as_i64(),
                    doc.amount.to_string(),
                    json,
                ])?;
            }
            Ok(())
        })
    }

    pub(crate) fn insert_currencies(&self, docs: &[CurrencyValue]) -> DigestResult<usize> {
        self.insert_chunked(docs, |tx, chunk| {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO currencies (currency, height, doc) VALUES (?, ?, ?)",
            )?;
            for doc in chunk {
                let json = serde_json::to_string(doc)?;
                stmt.execute(params![
                    doc.design.currency.as_str(),
                    doc.height.as_i64(),
                    json,
                ])?;
            }
            Ok(())
        })
    }

    pub(crate) fn insert_manifest(&self, manifest: &Manifest) -> DigestResult<()> {
        let json = serde_json::to_string(manifest)?;
        let conn = self.writer.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO manifests (height, hash, doc) VALUES (?, ?, ?)",
            params![
                manifest.height.as_i64(),
                manifest.hash.to_string(),
                json,
            ],
        )?;
        Ok(())
    }

    fn insert_chunked<T>(
        &self,
        docs: &[T],
        write_chunk: impl Fn(&rusqlite::Transaction<'_>, &[T]) -> DigestResult<()>,
    ) -> DigestResult<usize> {
        let mut written = 0;
        let mut guard = self.writer.lock().unwrap();
        let conn = &mut *guard;
        for chunk in docs.chunks(WRITE_CHUNK) {
            let tx = conn.transaction()?;
            write_chunk(&tx, chunk)?;
            tx.commit()?;
            written += chunk.len();
        }
        Ok(written)
    }
}

/// Generate a unique ID for in-memory shared-cache sqlite databases.
fn unique_id() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watermark_persists() {
        let store = DigestStore::in_memory().unwrap();
        assert_eq!(store.load_last_block().unwrap(), None);

        store.store_last_block(Height::new(9)).unwrap();
        assert_eq!(store.load_last_block().unwrap(), Some(Height::new(9)));
    }

    #[test]
    fn delete_all_clears_metadata() {
        let store = DigestStore::in_memory().unwrap();
        store.store_last_block(Height::new(3)).unwrap();
        store.delete_all().unwrap();
        assert_eq!(store.load_last_block().unwrap(), None);
    }
}
