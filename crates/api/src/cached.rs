//! The cacheable-GET pipeline: cache lookup, request coalescing, render,
//! best-effort cache write.

use std::future::Future;
use std::time::Duration;

use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use vista_cache::CapturedResponse;

use crate::error::{ApiError, ApiResult};
use crate::flight::{await_result, FlightSlot};
use crate::hal::Hal;
use crate::state::ApiState;
use crate::{ENCODER_HINT, ENCODER_HINT_HEADER, HAL_CONTENT_TYPE};

/// TTL for responses that cannot grow (full pages, immutable entities).
pub const TTL_LONG: Duration = Duration::from_secs(3600);
/// TTL for responses new blocks may extend or change.
pub const TTL_SHORT: Duration = Duration::from_secs(3);

/// Render a HAL document into a buffered response.
pub fn hal_captured<T: Serialize>(hal: &Hal<T>) -> ApiResult<CapturedResponse> {
    let body = serde_json::to_vec(hal).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(CapturedResponse::new(
        200,
        HAL_CONTENT_TYPE,
        ENCODER_HINT,
        body,
    ))
}

/// Replay a buffered response onto the wire.
pub fn replay(captured: CapturedResponse) -> Response {
    let builder = Response::builder()
        .status(captured.status)
        .header(header::CONTENT_TYPE, captured.content_type.as_str())
        .header(ENCODER_HINT_HEADER, captured.encoder_hint.as_str());
    builder
        .body(axum::body::Body::from(captured.body))
        .unwrap_or_else(|_| {
            ApiError::Internal("response assembly failed".into()).into_response()
        })
}

/// Serve a cacheable GET.
///
/// Cache hit: replay verbatim. Miss: the first request for this key runs
/// `f` exactly once; concurrent duplicates wait and receive the identical
/// response. Success responses are written back with the TTL `f` chose;
/// problem responses are fanned out but never cached. Cache writes are
/// best-effort and cannot fail the response.
pub async fn respond_cached<F, Fut>(state: &ApiState, key: String, f: F) -> Response
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ApiResult<(CapturedResponse, Duration)>>,
{
    if let Some(bytes) = state.cache.get(&key) {
        if let Some(captured) = CapturedResponse::from_cache_bytes(&bytes) {
            state.metrics.cache_hits.inc();
            return replay(captured);
        }
    }
    state.metrics.cache_misses.inc();

    match state.flights.join(&key) {
        FlightSlot::Leader(leader) => {
            let captured = match f().await {
                Ok((captured, ttl)) => {
                    if captured.is_success() {
                        state.cache.set(&key, captured.to_cache_bytes(), ttl);
                    }
                    captured
                }
                Err(err) => err.to_captured(),
            };
            leader.complete(captured.clone());
            replay(captured)
        }
        FlightSlot::Waiter(slot) => {
            state.metrics.requests_coalesced.inc();
            match await_result(slot).await {
                Some(captured) => replay(captured),
                None => ApiError::Internal("coalesced request aborted".into()).into_response(),
            }
        }
    }
}

/// Build a normalized cache key from the path and present query params.
pub fn cache_key(path: &str, params: &[(&str, Option<&str>)]) -> String {
    let mut key = path.to_string();
    let mut first = true;
    for (name, value) in params {
        if let Some(v) = value {
            key.push(if first { '?' } else { '&' });
            key.push_str(name);
            key.push('=');
            key.push_str(v);
            first = false;
        }
    }
    key
}
