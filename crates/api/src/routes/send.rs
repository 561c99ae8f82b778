//! Operation submission endpoint.

use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use vista_core::Operation;

use crate::cached::{hal_captured, replay};
use crate::error::ApiError;
use crate::hal::Hal;
use crate::state::{ApiState, SendItem};

/// Accept one operation or a batch, validate against the network id and
/// forward through the injected send function.
pub async fn send(State(state): State<ApiState>, body: Bytes) -> Response {
    let Some(sender) = state.sender.clone() else {
        return ApiError::Unavailable("send is not wired to a node".into()).into_response();
    };
    let item: SendItem = match serde_json::from_slice(&body) {
        Ok(item) => item,
        Err(e) => return ApiError::InvalidRequest(e.to_string()).into_response(),
    };

    for operation in item.operations() {
        if let Err(e) = state.builder.verify_operation(operation) {
            return ApiError::from(e).into_response();
        }
    }

    let operations: Vec<Operation> = item.operations().into_iter().cloned().collect();
    let outcome = match sender(item).await {
        Ok(value) => value,
        Err(e) => return ApiError::Internal(format!("send failed: {e}")).into_response(),
    };

    let mut hal = Hal::new(operations.clone())
        .with_self_link("/send")
        .with_extra("response", json!(outcome));
    for operation in &operations {
        let fact_hash = operation.fact_hash();
        hal = hal.with_link(
            &format!("operation:{fact_hash}"),
            format!("/operation/{fact_hash}"),
        );
    }
    match hal_captured(&hal) {
        Ok(captured) => replay(captured),
        Err(e) => e.into_response(),
    }
}
