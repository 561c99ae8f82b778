//! HTTP surface metrics.

use prometheus_client::metrics::counter::Counter;
use prometheus_client::registry::Registry;

/// Counters for the response cache and the coalescing layer.
#[derive(Clone, Default)]
pub struct ApiMetrics {
    pub cache_hits: Counter,
    pub cache_misses: Counter,
    /// Requests that attached to an identical in-flight one.
    pub requests_coalesced: Counter,
}

impl ApiMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, registry: &mut Registry) {
        registry.register(
            "api_cache_hits",
            "Response cache hits",
            self.cache_hits.clone(),
        );
        registry.register(
            "api_cache_misses",
            "Response cache misses",
            self.cache_misses.clone(),
        );
        registry.register(
            "api_requests_coalesced",
            "Requests served by an identical in-flight one",
            self.requests_coalesced.clone(),
        );
    }
}
