//! Route assembly and shared list-handler plumbing.

pub mod account;
pub mod block;
pub mod builder;
pub mod currency;
pub mod node;
pub mod operation;
pub mod send;

use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use crate::state::ApiState;

/// Rows per list page; a full page signals a complete (long-TTL) response.
pub const LIST_LIMIT: i64 = 50;

/// Common query parameters of list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Opaque cursor string.
    pub offset: Option<String>,
    /// Truthy values: `1`, `true`, `yes`.
    pub reverse: Option<String>,
}

impl ListParams {
    pub fn reverse(&self) -> bool {
        matches!(self.reverse.as_deref(), Some("1") | Some("true") | Some("yes"))
    }
}

/// Href for a list page at the given position.
pub fn page_href(path: &str, offset: Option<&str>, reverse: bool) -> String {
    crate::cached::cache_key(path, &[("offset", offset), ("reverse", reverse.then_some("1"))])
}

/// Wrap a page of items with `self`, `next` and `reverse` links.
pub(crate) fn page_hal<T: serde::Serialize>(
    path: &str,
    items: Vec<crate::hal::Hal<T>>,
    offset: Option<&str>,
    reverse: bool,
    next_offset: Option<String>,
) -> crate::hal::Hal<Vec<crate::hal::Hal<T>>> {
    let mut hal =
        crate::hal::Hal::new(items).with_self_link(page_href(path, offset, reverse));
    if let Some(next) = next_offset {
        hal = hal.with_link("next", page_href(path, Some(&next), reverse));
    }
    hal.with_link("reverse", page_href(path, offset, !reverse))
}

/// The full HTTP surface.
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(node::node_info))
        .route("/metrics", get(node::metrics))
        .route("/block/manifests", get(block::manifests))
        .route("/block/:height_or_hash", get(block::block))
        .route("/block/:height_or_hash/manifest", get(block::manifest))
        .route(
            "/block/:height_or_hash/operations",
            get(operation::block_operations),
        )
        .route("/account/:address", get(account::account))
        .route(
            "/account/:address/operations",
            get(account::account_operations),
        )
        .route("/operation/:hash", get(operation::operation))
        .route("/operations", get(operation::operations))
        .route("/currency", get(currency::currencies))
        .route("/currency/:id", get(currency::currency))
        .route("/builder/fact/template/:kind", get(builder::fact_template))
        .route("/builder/fact", post(builder::build_fact))
        .route("/builder/sign", post(builder::sign))
        .route("/builder/operation", post(builder::build_operation))
        .route("/send", post(send::send))
        .with_state(state)
}
