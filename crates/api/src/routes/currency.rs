//! Currency metadata endpoints.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use vista_core::CurrencyId;
use vista_digest::CurrencyValue;

use crate::cached::{hal_captured, respond_cached, TTL_SHORT};
use crate::error::ApiError;
use crate::hal::Hal;
use crate::state::ApiState;

fn currency_item_hal(value: CurrencyValue) -> Hal<CurrencyValue> {
    let id = value.design.currency.clone();
    Hal::new(value).with_self_link(format!("/currency/{id}"))
}

pub async fn currencies(State(state): State<ApiState>) -> Response {
    let database = state.database.clone();

    respond_cached(&state, "/currency".into(), move || async move {
        let designs = database.currencies()?;
        if designs.is_empty() {
            return Err(ApiError::NotFound("no currencies registered".into()));
        }
        let items: Vec<_> = designs.into_iter().map(currency_item_hal).collect();
        let hal = Hal::new(items).with_self_link("/currency");
        Ok((hal_captured(&hal)?, TTL_SHORT))
    })
    .await
}

pub async fn currency(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    let id = match CurrencyId::new(id) {
        Ok(id) => id,
        Err(e) => return ApiError::from(e).into_response(),
    };
    let database = state.database.clone();
    let key = format!("/currency/{id}");

    respond_cached(&state, key, move || async move {
        let value = database
            .currency(&id)?
            .ok_or_else(|| ApiError::NotFound(format!("currency {id} not found")))?;
        let mut hal = currency_item_hal(value);
        hal = hal.with_link("currencies", "/currency");
        Ok((hal_captured(&hal)?, TTL_SHORT))
    })
    .await
}
