//! Shared handler state.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use prometheus_client::registry::Registry;
use serde::Deserialize;
use vista_builder::Builder;
use vista_cache::Cache;
use vista_core::Operation;
use vista_digest::Database;

use crate::flight::Flights;
use crate::metrics::ApiMetrics;

/// Payload accepted by the send endpoint: one operation or a batch.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SendItem {
    Operation(Box<Operation>),
    Operations(Vec<Operation>),
}

impl SendItem {
    pub fn operations(&self) -> Vec<&Operation> {
        match self {
            SendItem::Operation(op) => vec![op],
            SendItem::Operations(ops) => ops.iter().collect(),
        }
    }
}

/// Future returned by the injected send function.
pub type SendFuture = Pin<Box<dyn Future<Output = Result<serde_json::Value, String>> + Send>>;
/// Forwards operations to the chain; injected by the embedding node.
pub type SendFn = Arc<dyn Fn(SendItem) -> SendFuture + Send + Sync>;

/// Everything a handler needs, cheap to clone.
#[derive(Clone)]
pub struct ApiState {
    pub database: Arc<Database>,
    pub builder: Arc<Builder>,
    pub cache: Arc<dyn Cache>,
    pub flights: Arc<Flights>,
    pub metrics: Arc<ApiMetrics>,
    pub registry: Arc<Registry>,
    pub sender: Option<SendFn>,
    /// Network name surfaced by the node-info endpoint.
    pub network: String,
    /// Node version surfaced by the node-info endpoint.
    pub version: String,
}

impl ApiState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        database: Arc<Database>,
        builder: Arc<Builder>,
        cache: Arc<dyn Cache>,
        registry: Arc<Registry>,
        metrics: Arc<ApiMetrics>,
        sender: Option<SendFn>,
        network: String,
        version: String,
    ) -> Self {
        ApiState {
            database,
            builder,
            cache,
            flights: Arc::new(Flights::new()),
            metrics,
            registry,
            sender,
            network,
            version,
        }
    }
}
