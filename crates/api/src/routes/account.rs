//! Account detail and per-account operation history.

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use vista_core::Address;
use vista_digest::OperationCursor;

use crate::cached::{cache_key, hal_captured, respond_cached, TTL_LONG, TTL_SHORT};
use crate::error::ApiError;
use crate::hal::Hal;
use crate::routes::operation::{operation_item_hal, parse_operation_offset};
use crate::routes::{page_hal, ListParams, LIST_LIMIT};
use crate::state::ApiState;

pub async fn account(State(state): State<ApiState>, Path(address): Path<String>) -> Response {
    let address = match Address::new(address) {
        Ok(a) => a,
        Err(e) => return ApiError::from(e).into_response(),
    };
    let database = state.database.clone();
    let key = format!("/account/{address}");

    respond_cached(&state, key.clone(), move || async move {
        let value = database
            .account(&address)?
            .ok_or_else(|| ApiError::NotFound(format!("account {address} not found")))?;

        let hal = Hal::new(value)
            .with_self_link(key)
            .with_link("operations", format!("/account/{address}/operations"));
        Ok((hal_captured(&hal)?, TTL_SHORT))
    })
    .await
}

pub async fn account_operations(
    State(state): State<ApiState>,
    Path(address): Path<String>,
    Query(params): Query<ListParams>,
) -> Response {
    let address = match Address::new(address) {
        Ok(a) => a,
        Err(e) => return ApiError::from(e).into_response(),
    };
    let offset = match parse_operation_offset(params.offset.as_deref()) {
        Ok(o) => o,
        Err(e) => return e.into_response(),
    };
    let reverse = params.reverse();
    let path = format!("/account/{address}/operations");
    let offset_str = offset.map(|c| c.to_string());
    let key = cache_key(
        &path,
        &[
            ("offset", offset_str.as_deref()),
            ("reverse", reverse.then_some("1")),
        ],
    );
    let database = state.database.clone();

    respond_cached(&state, key, move || async move {
        let mut items = Vec::new();
        let mut last = None;
        database.operations_by_address(&address, true, reverse, offset, LIST_LIMIT, |r| {
            last = Some(OperationCursor::new(r.height, r.index));
            if let Some(value) = r.value {
                items.push(operation_item_hal(value));
            }
            Ok(true)
        })?;
        if items.is_empty() {
            return Err(ApiError::NotFound(format!(
                "no operations for account {address}"
            )));
        }

        let full = items.len() as i64 >= LIST_LIMIT;
        let hal = page_hal(
            &path,
            items,
            offset_str.as_deref(),
            reverse,
            last.map(|c: OperationCursor| c.to_string()),
        );
        Ok((hal_captured(&hal)?, if full { TTL_LONG } else { TTL_SHORT }))
    })
    .await
}
