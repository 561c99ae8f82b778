//! Ingestion metrics.

use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;

/// Prometheus metrics for the digest pipeline.
#[derive(Clone)]
pub struct DigestMetrics {
    /// Blocks successfully indexed.
    pub blocks_indexed: Counter,
    /// Per-height ingestions that failed terminally (after retries).
    pub digest_failures: Counter,
    /// Documents written across all collections.
    pub documents_written: Counter,
    /// Whole-commit latency (cleanup + all write phases) in seconds.
    pub commit_latency_seconds: Histogram,
}

impl Default for DigestMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl DigestMetrics {
    pub fn new() -> Self {
        // Commit buckets: 100us to ~6.5s
        DigestMetrics {
            blocks_indexed: Counter::default(),
            digest_failures: Counter::default(),
            documents_written: Counter::default(),
            commit_latency_seconds: Histogram::new(exponential_buckets(0.0001, 2.0, 16)),
        }
    }

    /// Register all metrics under the given registry.
    pub fn register(&self, registry: &mut Registry) {
        registry.register(
            "digest_blocks_indexed",
            "Blocks successfully indexed",
            self.blocks_indexed.clone(),
        );
        registry.register(
            "digest_failures",
            "Per-height ingestions that failed after retries",
            self.digest_failures.clone(),
        );
        registry.register(
            "digest_documents_written",
            "Documents written across all collections",
            self.documents_written.clone(),
        );
        registry.register(
            "digest_commit_latency_seconds",
            "Whole-commit latency in seconds",
            self.commit_latency_seconds.clone(),
        );
    }
}
