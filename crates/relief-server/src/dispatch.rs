//! Dispatch service: the end-to-end path from an operator request to a
//! persisted route plan with a reserved drone.
//!
//! Two-phase discipline: the inventory draw, allocation record, and route
//! plan all ride one database transaction that commits only after the
//! drone's `ready -> on-mission` transition succeeds. Any earlier failure
//! or a dropped request future rolls the transaction back, so no stock is
//! drawn without a committed drone; once the transaction commits, only
//! emergency-stop interrupts the mission.

use anyhow::Context;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use relief_core::{
    allocate_with_policy, plan_routes, AllocationRequest, AllocationResult, DispatchError, Drone,
    Mission, RoutePlan,
};

use crate::persistence::inventory::ReserveStatus;
use crate::persistence::{disasters, inventory, plans};
use crate::state::AppState;

/// Bounded internal retries when a drone reservation races a concurrent
/// transition (telemetry auto-return, another dispatcher).
const MAX_RESERVE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchRequest {
    pub disaster_id: String,
    pub resource_type: String,
    pub quantity: u32,
    /// Reserve this specific drone; otherwise the lowest-id ready drone.
    pub drone_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchResponse {
    pub allocation_id: i64,
    pub route_plan_id: i64,
    pub allocation: AllocationResult,
    pub plan: RoutePlan,
    /// None when nothing could be allocated, so no drone was committed.
    pub drone: Option<Drone>,
    pub mission_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum DispatchServiceError {
    #[error("unknown disaster {0}")]
    UnknownDisaster(String),
    #[error("no ready drone in the fleet")]
    NoReadyDrone,
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub async fn dispatch(
    state: &AppState,
    request: DispatchRequest,
) -> Result<DispatchResponse, DispatchServiceError> {
    let pool = state.db().pool();
    let config = state.config();

    let target = disasters::get_location(pool, &request.disaster_id)
        .await?
        .ok_or_else(|| DispatchServiceError::UnknownDisaster(request.disaster_id.clone()))?;

    let allocation_request = AllocationRequest {
        disaster_id: request.disaster_id.clone(),
        resource_type: request.resource_type.clone(),
        required_quantity: request.quantity,
        target,
    };

    let snapshot = inventory::list_sources(pool, &request.resource_type).await?;
    let allocation =
        allocate_with_policy(&allocation_request, &snapshot, config.ranking_policy)?;
    let plan = plan_routes(&allocation_request, &allocation, &config.route_planner());

    if allocation.unmet_quantity > 0 {
        info!(
            disaster_id = %request.disaster_id,
            resource_type = %request.resource_type,
            unmet = allocation.unmet_quantity,
            "partial fulfillment"
        );
    }

    let mut tx = pool
        .begin()
        .await
        .context("begin dispatch transaction")
        .map_err(DispatchServiceError::Internal)?;

    match inventory::reserve_in(&mut tx, &allocation, &snapshot).await? {
        ReserveStatus::Reserved => {}
        ReserveStatus::Stale => {
            tx.rollback().await.ok();
            return Err(DispatchError::InventorySnapshotStale.into());
        }
    }

    let allocation_id =
        plans::save_allocation(&mut tx, &request.disaster_id, &request.resource_type, &allocation)
            .await?;
    let route_plan_id = plans::save_route_plan(&mut tx, &plan).await?;

    // Phase two: the drone commits first, the transaction second. A
    // drone-reservation failure rolls everything back; a commit failure
    // releases the drone.
    let (drone, mission_id) = if allocation.assignments.is_empty() {
        (None, None)
    } else {
        match reserve_drone(state, &request, route_plan_id) {
            Ok(drone) => {
                let mission_id = drone.current_mission_id.clone();
                (Some(drone), mission_id)
            }
            Err(err) => {
                tx.rollback().await.ok();
                return Err(err);
            }
        }
    };

    if let Err(err) = tx.commit().await {
        if let Some(drone) = &drone {
            state.registry.release_drone(&drone.id);
        }
        return Err(DispatchServiceError::Internal(
            anyhow::Error::from(err).context("commit dispatch transaction"),
        ));
    }

    info!(
        disaster_id = %request.disaster_id,
        route_plan_id,
        allocated = allocation.total_allocated,
        drone = drone.as_ref().map(|d| d.id.as_str()).unwrap_or("-"),
        "dispatch complete"
    );

    Ok(DispatchResponse {
        allocation_id,
        route_plan_id,
        allocation,
        plan,
        drone,
        mission_id,
    })
}

fn new_mission(drone_id: &str, disaster_id: &str, route_plan_id: i64) -> Mission {
    Mission {
        id: format!("MSN-{}", &uuid::Uuid::new_v4().to_string()[..8].to_uppercase()),
        drone_id: drone_id.to_string(),
        disaster_id: disaster_id.to_string(),
        route_plan_id: Some(route_plan_id),
        started_at: Utc::now(),
        ended_at: None,
    }
}

fn reserve_drone(
    state: &AppState,
    request: &DispatchRequest,
    route_plan_id: i64,
) -> Result<Drone, DispatchServiceError> {
    let registry = &state.registry;

    // Operator-picked drone: no fallback, surface the failure directly.
    if let Some(drone_id) = &request.drone_id {
        let mission = new_mission(drone_id, &request.disaster_id, route_plan_id);
        return Ok(registry.dispatch_drone(drone_id, mission)?);
    }

    let mut last_conflict: Option<DispatchError> = None;
    for _ in 0..MAX_RESERVE_ATTEMPTS {
        let Some(candidate) = registry.first_ready() else {
            return Err(DispatchServiceError::NoReadyDrone);
        };
        let mission = new_mission(&candidate.id, &request.disaster_id, route_plan_id);
        match registry.dispatch_drone_expecting(&candidate.id, candidate.status, mission) {
            Ok(drone) => return Ok(drone),
            // Lost the race; re-read and try the next ready drone.
            Err(err @ DispatchError::RegistryConflict { .. })
            | Err(err @ DispatchError::DroneUnavailable { .. }) => {
                last_conflict = Some(err);
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(last_conflict
        .map(DispatchServiceError::Dispatch)
        .unwrap_or(DispatchServiceError::NoReadyDrone))
}
