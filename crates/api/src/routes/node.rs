//! Node-info root endpoint and the metrics exposition.

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use vista_core::NodeInfo;

use crate::cached::{hal_captured, respond_cached, TTL_SHORT};
use crate::error::ApiError;
use crate::hal::Hal;
use crate::state::ApiState;

pub async fn node_info(State(state): State<ApiState>) -> Response {
    let database = state.database.clone();
    let network = state.network.clone();
    let version = state.version.clone();

    respond_cached(&state, "/".into(), move || async move {
        let last_height = database.last_block();
        let last_block = if last_height.is_nil() {
            None
        } else {
            database.manifest(last_height)?
        };

        let info = NodeInfo {
            network,
            version,
            last_block: last_block.clone(),
        };
        let mut hal = Hal::new(info)
            .with_self_link("/")
            .with_link("currencies", "/currency")
            .with_link("operations", "/operations");
        if let Some(manifest) = last_block {
            hal = hal.with_link("block", format!("/block/{}", manifest.height));
        }
        Ok((hal_captured(&hal)?, TTL_SHORT))
    })
    .await
}

/// Prometheus text exposition. Never cached.
pub async fn metrics(State(state): State<ApiState>) -> Response {
    let mut buf = String::new();
    match prometheus_client::encoding::text::encode(&mut buf, &state.registry) {
        Ok(()) => Response::builder()
            .status(200)
            .header(
                header::CONTENT_TYPE,
                "application/openmetrics-text; version=1.0.0; charset=utf-8",
            )
            .body(axum::body::Body::from(buf))
            .unwrap_or_else(|_| {
                ApiError::Internal("response assembly failed".into()).into_response()
            }),
        Err(e) => ApiError::Internal(format!("metrics encode: {e}")).into_response(),
    }
}
