//! Route table.

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

use super::{dispatch, fleet, forecast, ws};

pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/v1/dispatch", post(dispatch::create_dispatch))
        .route("/v1/routes/:id", get(dispatch::get_route))
        .route(
            "/v1/fleet",
            get(fleet::list_fleet).post(fleet::register_drone),
        )
        .route("/v1/fleet/:id", get(fleet::get_drone))
        .route("/v1/fleet/:id/emergency-stop", post(fleet::emergency_stop))
        .route("/v1/fleet/:id/resolve", post(fleet::resolve_emergency))
        .route("/v1/fleet/:id/decommission", post(fleet::decommission))
        .route("/v1/forecast", post(forecast::create_forecast))
        .route("/v1/stream", get(ws::ws_handler))
}
