use axum::{extract::State, response::IntoResponse, routing::post, Json, Router};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use super::{validate_input, JsonBody};
use crate::{errors::ServiceError, AppState};

/// Body of `POST /forecast`
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ForecastRequest {
    #[validate(length(min = 1, message = "storeId must not be empty"))]
    pub store_id: String,
    #[validate(length(min = 1, message = "itemId must not be empty"))]
    pub item_id: String,
}

/// Body of `POST /forecast/store`
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StoreForecastRequest {
    #[validate(length(min = 1, message = "storeId must not be empty"))]
    pub store_id: String,
}

/// Reorder suggestion for one item of a store
pub async fn forecast_item(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ForecastRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    info!(store_id = %payload.store_id, item_id = %payload.item_id, "forecast requested");

    let result = state
        .forecasts
        .forecast_item(&payload.store_id, &payload.item_id)
        .await?;
    Ok(Json(result))
}

/// Reorder suggestions for every item of a store
pub async fn forecast_store(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<StoreForecastRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    info!(store_id = %payload.store_id, "store forecast requested");

    let store = state.forecasts.forecast_store(&payload.store_id).await?;
    Ok(Json(store))
}

pub fn forecast_routes() -> Router<AppState> {
    Router::new()
        .route("/forecast", post(forecast_item))
        .route("/forecast/store", post(forecast_store))
}
