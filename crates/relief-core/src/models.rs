//! Core data models for dispatch and fleet coordination.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::geo::Coordinate;

/// A read-only snapshot of a supply source (warehouse stock row).
///
/// Owned by the inventory collaborator; valid for the duration of one
/// allocation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplySource {
    pub id: i64,
    pub name: String,
    pub coordinate: Coordinate,
    pub resource_type: String,
    pub available_quantity: u32,
    pub last_updated: DateTime<Utc>,
}

/// A request to allocate supplies toward a disaster site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub disaster_id: String,
    pub resource_type: String,
    pub required_quantity: u32,
    pub target: Coordinate,
}

/// One (source, quantity) draw produced by the allocator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub source_id: i64,
    pub source_name: String,
    pub quantity: u32,
    pub distance_km: f64,
    pub from: Coordinate,
    pub to: Coordinate,
    /// Straight-line route: source then target.
    pub waypoints: Vec<Coordinate>,
}

/// Ordered outcome of one allocation pass.
///
/// `unmet_quantity > 0` is a normal partial-fulfillment result, not an
/// error; the caller decides escalation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationResult {
    /// Ascending by distance, ties broken by source id.
    pub assignments: Vec<Assignment>,
    pub total_allocated: u32,
    pub unmet_quantity: u32,
}

impl AllocationResult {
    pub fn is_fully_met(&self) -> bool {
        self.unmet_quantity == 0
    }
}

/// One route leg with its time estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteLeg {
    pub assignment: Assignment,
    pub eta_minutes: f64,
}

/// Full route plan for an allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePlan {
    pub disaster_id: String,
    pub resource_type: String,
    pub legs: Vec<RouteLeg>,
    /// Maximum leg ETA: the operation completes when the slowest leg
    /// arrives, so this is deliberately not a sum.
    pub overall_eta_minutes: f64,
}

/// Current state of a registered drone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drone {
    pub id: String,
    pub name: String,
    pub max_capacity: u32,
    pub status: DroneStatus,
    pub coordinate: Coordinate,
    pub battery_percent: f64,
    pub current_mission_id: Option<String>,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DroneStatus {
    /// Idle at full readiness, dispatchable
    #[default]
    Ready,
    /// On the ground, battery recovering
    Charging,
    /// Executing a delivery mission
    OnMission,
    /// Battery-forced return to base
    Returning,
    /// Emergency-stopped by an operator
    Emergency,
    /// Removed from rotation, retained for audit (terminal)
    Decommissioned,
}

impl DroneStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, DroneStatus::Decommissioned)
    }

    /// Whether the drone is physically airborne; position updates are
    /// only legal in these states.
    pub fn is_moving(self) -> bool {
        matches!(self, DroneStatus::OnMission | DroneStatus::Returning)
    }

    /// Closed transition table for the fleet state machine.
    pub fn can_transition_to(self, next: DroneStatus) -> bool {
        use DroneStatus::*;
        match (self, next) {
            // Explicit deactivation, irreversible
            (from, Decommissioned) => !from.is_terminal(),
            (Ready, OnMission) => true,
            (OnMission, Returning) => true,
            (OnMission | Returning, Emergency) => true,
            (Returning, Charging) => true,
            (Charging, Ready) => true,
            (Emergency, Ready) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for DroneStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DroneStatus::Ready => "ready",
            DroneStatus::Charging => "charging",
            DroneStatus::OnMission => "on-mission",
            DroneStatus::Returning => "returning",
            DroneStatus::Emergency => "emergency",
            DroneStatus::Decommissioned => "decommissioned",
        };
        f.write_str(label)
    }
}

/// A drone's commitment against one allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mission {
    pub id: String,
    pub drone_id: String,
    pub disaster_id: String,
    pub route_plan_id: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// Opaque result of the demand-forecast collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandEstimate {
    /// Predicted quantity per resource type over the horizon.
    pub quantities: BTreeMap<String, u32>,
    /// Model confidence in 0.0..=1.0.
    pub accuracy: f64,
}
