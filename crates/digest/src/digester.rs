//! Asynchronous, retrying ingestion orchestrator.
//!
//! A bounded inbound queue feeds one background worker; the worker launches
//! each block's digestion as its own task so a slow height does not stall
//! acceptance of the next. A shared lock serializes the prepare+commit
//! critical section across in-flight blocks — height-scoped cleanup and
//! insertion must never interleave. Heights may complete out of submission
//! order; the watermark is monotonic-only and tolerates that.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use vista_core::{Block, Height};

use crate::database::Database;
use crate::error::{DigestError, DigestResult};
use crate::session::BlockSession;

/// Bound of the inbound block queue.
pub const QUEUE_CAPACITY: usize = 64;
/// Attempts per block before the failure is terminal.
pub const MAX_ATTEMPTS: u32 = 3;
/// Fixed delay between attempts.
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Per-height ingestion outcome, reported on the event channel.
#[derive(Debug, Clone, PartialEq)]
pub struct DigestEvent {
    pub height: Height,
    /// `None` on success, the terminal error otherwise.
    pub error: Option<String>,
}

impl DigestEvent {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Start/stop-able ingestion daemon.
pub struct Digester {
    queue: Mutex<Option<mpsc::Sender<Block>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Digester {
    /// Spawn the worker. Events, if a channel is given, carry one entry per
    /// digested height.
    pub fn start(database: Arc<Database>, events: Option<mpsc::Sender<DigestEvent>>) -> Self {
        let (tx, mut rx) = mpsc::channel::<Block>(QUEUE_CAPACITY);
        let commit_lock = Arc::new(AsyncMutex::new(()));

        let worker = tokio::spawn(async move {
            while let Some(block) = rx.recv().await {
                let database = database.clone();
                let commit_lock = commit_lock.clone();
                let events = events.clone();
                tokio::spawn(async move {
                    digest_one(database, block, commit_lock, events).await;
                });
            }
            tracing::debug!("digester worker stopped");
        });

        Digester {
            queue: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Enqueue a batch for ingestion, ascending by height.
    pub async fn digest(&self, mut blocks: Vec<Block>) -> DigestResult<()> {
        blocks.sort_by_key(|b| b.height());
        let sender = self
            .queue
            .lock()
            .clone()
            .ok_or(DigestError::Stopped)?;
        for block in blocks {
            sender.send(block).await.map_err(|_| DigestError::Stopped)?;
        }
        Ok(())
    }

    /// Stop accepting blocks and wait for the worker to wind down.
    /// Idempotent: later calls are no-ops.
    pub async fn stop(&self) {
        drop(self.queue.lock().take());
        let worker = self.worker.lock().take();
        if let Some(handle) = worker {
            let _ = handle.await;
        }
    }
}

async fn digest_one(
    database: Arc<Database>,
    block: Block,
    commit_lock: Arc<AsyncMutex<()>>,
    events: Option<mpsc::Sender<DigestEvent>>,
) {
    let height = block.height();
    let mut last_error = String::new();

    for attempt in 1..=MAX_ATTEMPTS {
        let result = {
            let _guard = commit_lock.lock().await;
            let mut session = BlockSession::new(&database, block.clone());
            session.prepare().and_then(|_| session.commit())
        };
        match result {
            Ok(()) => {
                if let Err(e) = database.set_last_block(height) {
                    tracing::warn!(%height, error = %e, "watermark update failed");
                }
                database.metrics().blocks_indexed.inc();
                tracing::info!(%height, "block digested");
                emit(&events, DigestEvent {
                    height,
                    error: None,
                })
                .await;
                return;
            }
            Err(DigestError::ReadOnly) => {
                last_error = DigestError::ReadOnly.to_string();
                break;
            }
            Err(e) => {
                last_error = e.to_string();
                tracing::warn!(%height, attempt, error = %last_error, "digest attempt failed");
                if attempt < MAX_ATTEMPTS {
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }

    database.metrics().digest_failures.inc();
    tracing::error!(%height, error = %last_error, "digest failed terminally");
    emit(&events, DigestEvent {
        height,
        error: Some(last_error),
    })
    .await;
}

async fn emit(events: &Option<mpsc::Sender<DigestEvent>>, event: DigestEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event).await;
    }
}
