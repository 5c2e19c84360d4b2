//! Demand forecast API endpoint.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::persistence::{disasters, plans};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ForecastRequest {
    pub disaster_id: String,
    pub resource_types: Vec<String>,
    pub horizon_hours: u32,
}

#[derive(Debug, Serialize)]
pub struct ForecastResponse {
    pub forecast_id: i64,
    pub disaster_id: String,
    pub quantities: BTreeMap<String, u32>,
    pub accuracy: f64,
}

/// Estimate demand for a disaster over a horizon and persist the result.
/// POST /v1/forecast
pub async fn create_forecast(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ForecastRequest>,
) -> Result<Json<ForecastResponse>, StatusCode> {
    if request.resource_types.is_empty() || request.horizon_hours == 0 {
        return Err(StatusCode::BAD_REQUEST);
    }

    let pool = state.db().pool();
    let known = disasters::get_location(pool, &request.disaster_id)
        .await
        .map_err(|err| {
            tracing::error!("Disaster lookup failed: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    if known.is_none() {
        return Err(StatusCode::NOT_FOUND);
    }

    let estimate = state.forecaster().estimate(
        &request.disaster_id,
        &request.resource_types,
        request.horizon_hours,
    );

    let forecast_id = plans::save_forecast(pool, &request.disaster_id, &estimate)
        .await
        .map_err(|err| {
            tracing::error!("Failed to persist forecast: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(ForecastResponse {
        forecast_id,
        disaster_id: request.disaster_id,
        quantities: estimate.quantities,
        accuracy: estimate.accuracy,
    }))
}
