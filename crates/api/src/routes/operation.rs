//! Operation detail and listing endpoints.

use std::str::FromStr;

use alloy_primitives::B256;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use vista_core::Height;
use vista_digest::{Database, OperationCursor, OperationValue, OperationsFilter};

use crate::cached::{cache_key, hal_captured, respond_cached, TTL_LONG, TTL_SHORT};
use crate::error::{ApiError, ApiResult};
use crate::hal::Hal;
use crate::routes::{page_hal, ListParams, LIST_LIMIT};
use crate::state::ApiState;

pub(crate) fn operation_item_hal(value: OperationValue) -> Hal<OperationValue> {
    let fact_hash = value.fact_hash();
    let height = value.height;
    Hal::new(value)
        .with_self_link(format!("/operation/{fact_hash}"))
        .with_link("block", format!("/block/{height}"))
}

pub(crate) fn parse_operation_offset(raw: Option<&str>) -> ApiResult<Option<OperationCursor>> {
    match raw {
        Some(s) => Ok(Some(s.parse::<OperationCursor>()?)),
        None => Ok(None),
    }
}

/// Collect one page of a filtered operation listing.
pub(crate) fn collect_page(
    database: &Database,
    filter: OperationsFilter,
    reverse: bool,
    offset: Option<OperationCursor>,
) -> ApiResult<(Vec<Hal<OperationValue>>, Option<OperationCursor>)> {
    let mut items = Vec::new();
    let mut last = None;
    database.operations(filter, true, reverse, offset, LIST_LIMIT, |r| {
        last = Some(OperationCursor::new(r.height, r.index));
        if let Some(value) = r.value {
            items.push(operation_item_hal(value));
        }
        Ok(true)
    })?;
    Ok((items, last))
}

pub async fn operation(State(state): State<ApiState>, Path(hash): Path<String>) -> Response {
    let fact_hash = match B256::from_str(&hash) {
        Ok(h) => h,
        Err(_) => {
            return ApiError::InvalidRequest(format!("bad operation hash: {hash}")).into_response()
        }
    };
    let database = state.database.clone();
    let key = format!("/operation/{fact_hash}");

    respond_cached(&state, key, move || async move {
        let found = database
            .operation(&fact_hash, true)?
            .and_then(|r| r.value)
            .ok_or_else(|| ApiError::NotFound(format!("operation {fact_hash} not found")))?;
        Ok((hal_captured(&operation_item_hal(found))?, TTL_LONG))
    })
    .await
}

pub async fn operations(
    State(state): State<ApiState>,
    Query(params): Query<ListParams>,
) -> Response {
    let offset = match parse_operation_offset(params.offset.as_deref()) {
        Ok(o) => o,
        Err(e) => return e.into_response(),
    };
    let reverse = params.reverse();
    let path = "/operations";
    let offset_str = offset.map(|c| c.to_string());
    let key = cache_key(
        path,
        &[
            ("offset", offset_str.as_deref()),
            ("reverse", reverse.then_some("1")),
        ],
    );
    let database = state.database.clone();

    respond_cached(&state, key, move || async move {
        let (items, last) = collect_page(&database, OperationsFilter::All, reverse, offset)?;
        if items.is_empty() {
            return Err(ApiError::NotFound("no operations in range".into()));
        }
        let full = items.len() as i64 >= LIST_LIMIT;
        let hal = page_hal(
            path,
            items,
            offset_str.as_deref(),
            reverse,
            last.map(|c| c.to_string()),
        );
        Ok((hal_captured(&hal)?, if full { TTL_LONG } else { TTL_SHORT }))
    })
    .await
}

pub async fn block_operations(
    State(state): State<ApiState>,
    Path(height_or_hash): Path<String>,
    Query(params): Query<ListParams>,
) -> Response {
    let height = match height_or_hash.parse::<Height>() {
        Ok(h) => h,
        Err(_) => {
            return ApiError::InvalidRequest(format!("bad height: {height_or_hash}"))
                .into_response()
        }
    };
    let offset = match parse_operation_offset(params.offset.as_deref()) {
        Ok(o) => o,
        Err(e) => return e.into_response(),
    };
    let reverse = params.reverse();
    let path = format!("/block/{height}/operations");
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
        let (items, last) = collect_page(
            &database,
            OperationsFilter::AtHeight(height),
            reverse,
            offset,
        )?;
        if items.is_empty() {
            return Err(ApiError::NotFound(format!(
                "no operations at height {height}"
            )));
        }
        let full = items.len() as i64 >= LIST_LIMIT;
        let hal = page_hal(
            &path,
            items,
            offset_str.as_deref(),
            reverse,
            last.map(|c| c.to_string()),
        );
        Ok((hal_captured(&hal)?, if full { TTL_LONG } else { TTL_SHORT }))
    })
    .await
}
