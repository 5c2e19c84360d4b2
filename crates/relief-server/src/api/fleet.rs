//! Fleet API endpoints: registration, state queries, operator commands.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use relief_core::{Coordinate, DispatchError, Drone, Mission};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterDroneRequest {
    pub name: String,
    pub max_capacity: u32,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Serialize)]
pub struct DroneDetail {
    #[serde(flatten)]
    pub drone: Drone,
    pub mission: Option<Mission>,
}

/// List the whole fleet, decommissioned drones included (audit view).
/// GET /v1/fleet
pub async fn list_fleet(State(state): State<Arc<AppState>>) -> Json<Vec<Drone>> {
    Json(state.registry.snapshot())
}

/// Register a new drone; it starts ready at full battery.
/// POST /v1/fleet
pub async fn register_drone(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterDroneRequest>,
) -> (StatusCode, Json<Drone>) {
    let drone = state.registry.register(
        &request.name,
        request.max_capacity,
        Coordinate::new(request.lat, request.lon),
    );
    tracing::info!("Registered drone {} ({})", drone.id, drone.name);
    (StatusCode::CREATED, Json(drone))
}

/// One drone with its current mission, if any.
/// GET /v1/fleet/{id}
pub async fn get_drone(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DroneDetail>, StatusCode> {
    let drone = state.registry.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    let mission = drone
        .current_mission_id
        .as_deref()
        .and_then(|mission_id| state.registry.mission(mission_id));
    Ok(Json(DroneDetail { drone, mission }))
}

/// POST /v1/fleet/{id}/emergency-stop
pub async fn emergency_stop(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Drone>, StatusCode> {
    apply_command(&state, &id, |registry| registry.emergency_stop(&id))
}

/// POST /v1/fleet/{id}/resolve
pub async fn resolve_emergency(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Drone>, StatusCode> {
    apply_command(&state, &id, |registry| registry.resolve_emergency(&id))
}

/// POST /v1/fleet/{id}/decommission
pub async fn decommission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Drone>, StatusCode> {
    apply_command(&state, &id, |registry| registry.decommission(&id))
}

fn apply_command(
    state: &AppState,
    drone_id: &str,
    command: impl FnOnce(&crate::state::FleetRegistry) -> Result<Drone, DispatchError>,
) -> Result<Json<Drone>, StatusCode> {
    if state.registry.get(drone_id).is_none() {
        return Err(StatusCode::NOT_FOUND);
    }
    match command(&state.registry) {
        Ok(drone) => {
            tracing::info!("Drone {} now {}", drone.id, drone.status);
            Ok(Json(drone))
        }
        // Illegal transition for the drone's current state
        Err(_) => Err(StatusCode::CONFLICT),
    }
}
