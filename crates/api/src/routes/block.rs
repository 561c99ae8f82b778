//! Block and manifest endpoints.

use std::str::FromStr;

use alloy_primitives::B256;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use vista_core::{Height, Manifest};
use vista_digest::HeightCursor;

use crate::cached::{cache_key, hal_captured, respond_cached, TTL_LONG, TTL_SHORT};
use crate::error::ApiError;
use crate::hal::Hal;
use crate::routes::{page_href, ListParams, LIST_LIMIT};
use crate::state::ApiState;

/// `height` as a decimal number, or a block hash.
enum BlockKey {
    Height(Height),
    Hash(B256),
}

fn parse_block_key(raw: &str) -> Result<BlockKey, ApiError> {
    if let Ok(height) = raw.parse::<Height>() {
        return Ok(BlockKey::Height(height));
    }
    B256::from_str(raw)
        .map(BlockKey::Hash)
        .map_err(|_| ApiError::InvalidRequest(format!("neither height nor block hash: {raw}")))
}

fn manifest_hal(manifest: Manifest) -> Hal<Manifest> {
    let height = manifest.height;
    let mut hal = Hal::new(manifest)
        .with_self_link(format!("/block/{height}"))
        .with_link("manifest", format!("/block/{height}/manifest"))
        .with_link("operations", format!("/block/{height}/operations"))
        .with_link("next", format!("/block/{}", height.next()));
    if height > Height::GENESIS {
        hal = hal.with_link("prev", format!("/block/{}", height.prev()));
    }
    hal
}

pub async fn block(
    State(state): State<ApiState>,
    Path(height_or_hash): Path<String>,
) -> Response {
    let key = match parse_block_key(&height_or_hash) {
        Ok(k) => k,
        Err(e) => return e.into_response(),
    };
    let database = state.database.clone();
    let cache_path = format!("/block/{height_or_hash}");

    respond_cached(&state, cache_path, move || async move {
        let manifest = match key {
            BlockKey::Height(h) => database.manifest(h)?,
            BlockKey::Hash(hash) => database.manifest_by_hash(&hash)?,
        }
        .ok_or_else(|| ApiError::NotFound(format!("block {height_or_hash} not found")))?;

        Ok((hal_captured(&manifest_hal(manifest))?, TTL_LONG))
    })
    .await
}

pub async fn manifest(
    State(state): State<ApiState>,
    Path(height_or_hash): Path<String>,
) -> Response {
    let key = match parse_block_key(&height_or_hash) {
        Ok(k) => k,
        Err(e) => return e.into_response(),
    };
    let database = state.database.clone();
    let cache_path = format!("/block/{height_or_hash}/manifest");

    respond_cached(&state, cache_path.clone(), move || async move {
        let manifest = match key {
            BlockKey::Height(h) => database.manifest(h)?,
            BlockKey::Hash(hash) => database.manifest_by_hash(&hash)?,
        }
        .ok_or_else(|| ApiError::NotFound(format!("manifest {height_or_hash} not found")))?;

        let height = manifest.height;
        let hal = Hal::new(manifest)
            .with_self_link(cache_path)
            .with_link("block", format!("/block/{height}"));
        Ok((hal_captured(&hal)?, TTL_LONG))
    })
    .await
}

pub async fn manifests(
    State(state): State<ApiState>,
    Query(params): Query<ListParams>,
) -> Response {
    let offset = match params.offset.as_deref() {
        Some(raw) => match raw.parse::<HeightCursor>() {
            Ok(c) => Some(c),
            Err(e) => return ApiError::from(e).into_response(),
        },
        None => None,
    };
    let reverse = params.reverse();
    let path = "/block/manifests";
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
        let mut items = Vec::new();
        let mut last: Option<Height> = None;
        database.manifests(true, reverse, offset, LIST_LIMIT, |height, manifest| {
            last = Some(height);
            if let Some(m) = manifest {
                items.push(
                    Hal::new(m).with_self_link(format!("/block/{height}/manifest")),
                );
            }
            Ok(true)
        })?;
        if items.is_empty() {
            return Err(ApiError::NotFound("no manifests in range".into()));
        }

        let full = items.len() as i64 >= LIST_LIMIT;
        let mut hal = Hal::new(items)
            .with_self_link(page_href(path, offset_str.as_deref(), reverse));
        if let Some(last) = last {
            hal = hal.with_link("next", page_href(path, Some(&last.to_string()), reverse));
        }
        hal = hal.with_link(
            "reverse",
            page_href(path, offset_str.as_deref(), !reverse),
        );
        Ok((hal_captured(&hal)?, if full { TTL_LONG } else { TTL_SHORT }))
    })
    .await
}
