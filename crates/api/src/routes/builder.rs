//! Wallet-facing build endpoints.
//!
//! The template endpoint is a deterministic GET and caches like any other
//! read; the POST endpoints validate client payloads and are never cached.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use vista_builder::SignRequest;

use crate::cached::{hal_captured, replay, respond_cached, TTL_LONG};
use crate::error::ApiError;
use crate::hal::Hal;
use crate::state::ApiState;

/// Render a HAL document straight onto the wire, bypassing the cache.
fn direct_hal<T: Serialize>(hal: Hal<T>) -> Response {
    match hal_captured(&hal) {
        Ok(captured) => replay(captured),
        Err(e) => e.into_response(),
    }
}

pub async fn fact_template(State(state): State<ApiState>, Path(kind): Path<String>) -> Response {
    let builder = state.builder.clone();
    let key = format!("/builder/fact/template/{kind}");

    respond_cached(&state, key.clone(), move || async move {
        let fact = builder.fact_template(&kind)?;
        let hal = Hal::new(fact)
            .with_self_link(key)
            .with_link("fact", "/builder/fact");
        Ok((hal_captured(&hal)?, TTL_LONG))
    })
    .await
}

pub async fn build_fact(State(state): State<ApiState>, body: Bytes) -> Response {
    match state.builder.build_fact(&body) {
        Ok(built) => {
            let hal = Hal::new(built.fact)
                .with_self_link("/builder/fact")
                .with_link("sign", "/builder/sign")
                .with_extra("signature_base", json!(hex::encode(&built.signature_base)));
            direct_hal(hal)
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn sign(State(state): State<ApiState>, body: Bytes) -> Response {
    let request: SignRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => return ApiError::InvalidRequest(e.to_string()).into_response(),
    };
    match state.builder.attach_sign(request) {
        Ok(operation) => {
            let fact_hash = operation.fact_hash();
            let hal = Hal::new(operation)
                .with_self_link("/builder/sign")
                .with_link("send", "/send")
                .with_link("operation", format!("/operation/{fact_hash}"));
            direct_hal(hal)
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn build_operation(State(state): State<ApiState>, body: Bytes) -> Response {
    match state.builder.build_operation(&body) {
        Ok(operation) => {
            let fact_hash = operation.fact_hash();
            let hal = Hal::new(operation)
                .with_self_link("/builder/operation")
                .with_link("send", "/send")
                .with_link("operation", format!("/operation/{fact_hash}"));
            direct_hal(hal)
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}
