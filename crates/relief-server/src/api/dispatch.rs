//! Dispatch API endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use relief_core::{DispatchError, RoutePlan};

use crate::dispatch::{self, DispatchRequest, DispatchResponse, DispatchServiceError};
use crate::persistence::plans;
use crate::state::AppState;

/// Run an allocation + dispatch for a disaster.
/// POST /v1/dispatch
pub async fn create_dispatch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DispatchRequest>,
) -> Result<Json<DispatchResponse>, StatusCode> {
    match dispatch::dispatch(&state, request).await {
        Ok(response) => Ok(Json(response)),
        Err(DispatchServiceError::UnknownDisaster(_)) => Err(StatusCode::NOT_FOUND),
        Err(DispatchServiceError::NoReadyDrone) => Err(StatusCode::CONFLICT),
        Err(DispatchServiceError::Dispatch(DispatchError::InvalidRequest(_))) => {
            Err(StatusCode::BAD_REQUEST)
        }
        Err(DispatchServiceError::Dispatch(_)) => Err(StatusCode::CONFLICT),
        Err(DispatchServiceError::Internal(err)) => {
            tracing::error!("Dispatch failed: {err:#}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Load a persisted route plan.
/// GET /v1/routes/{id}
pub async fn get_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<RoutePlan>, StatusCode> {
    let plan = plans::load_route_plan(state.db().pool(), id)
        .await
        .map_err(|err| {
            tracing::error!("Failed to load route plan {id}: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    plan.map(Json).ok_or(StatusCode::NOT_FOUND)
}
