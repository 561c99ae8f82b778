//! Block ingestion and query engine for the vista read-model.
//!
//! This crate turns finalized blocks into queryable projection documents
//! and serves them back with cursor pagination:
//!
//! - [`DigestStore`] owns the sqlite collections (operations, accounts,
//!   balances, currencies, manifests) plus the watermark singleton, with a
//!   pooled read side and a dedicated writer connection.
//! - [`BlockSession`] projects one finalized block: `prepare()` builds the
//!   documents in memory, `commit()` clears the height and bulk-writes them
//!   in chunks, so re-running a block is always safe.
//! - [`Database`] is the read surface: paginated, filterable queries and
//!   the monotonic last-block watermark.
//! - [`Digester`] drives ingestion asynchronously with bounded retry and
//!   per-height success/failure events.
//!
//! Projections are append-only; a new height supersedes an old one by query
//! ordering, and `clean_by_height` is the only destructive path (full reset
//! and reorg rollback).

pub mod cursor;
pub mod database;
pub mod digester;
pub mod error;
pub mod metrics;
pub mod session;
pub mod store;
pub mod types;

pub use cursor::{HeightCursor, OperationCursor};
pub use database::{Database, OperationsFilter};
pub use digester::{DigestEvent, Digester};
pub use error::{DigestError, DigestResult};
pub use metrics::DigestMetrics;
pub use session::BlockSession;
pub use store::DigestStore;
pub use types::{AccountValue, BalanceRecord, CurrencyValue, OperationRef, OperationValue};
