//! Route planning: expand an allocation into route legs with time estimates.
//!
//! Legs are straight lines (source to target); road-following routing is
//! deliberately out of scope. ETAs are estimates derived from distance and
//! an assumed cruise speed plus a fixed handling overhead.

use serde::{Deserialize, Serialize};

use crate::models::{AllocationRequest, AllocationResult, RouteLeg, RoutePlan};

pub const DEFAULT_SPEED_KMH: f64 = 60.0;
pub const DEFAULT_HANDLING_MINUTES: f64 = 30.0;

/// Transport mode for a relief route, each with its own cruise speed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    #[default]
    Ground,
    Air,
    Water,
}

impl TransportMode {
    pub fn cruise_speed_kmh(self) -> f64 {
        match self {
            TransportMode::Ground => 60.0,
            TransportMode::Air => 120.0,
            TransportMode::Water => 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RoutePlannerConfig {
    /// Cruising speed used for the estimate.
    pub assumed_speed_kmh: f64,
    /// Constant loading/unloading overhead per leg.
    pub fixed_handling_minutes: f64,
    pub transport_mode: TransportMode,
}

impl Default for RoutePlannerConfig {
    fn default() -> Self {
        Self {
            assumed_speed_kmh: DEFAULT_SPEED_KMH,
            fixed_handling_minutes: DEFAULT_HANDLING_MINUTES,
            transport_mode: TransportMode::Ground,
        }
    }
}

impl RoutePlannerConfig {
    /// Config with the mode's own cruise speed.
    pub fn for_mode(mode: TransportMode) -> Self {
        Self {
            assumed_speed_kmh: mode.cruise_speed_kmh(),
            fixed_handling_minutes: DEFAULT_HANDLING_MINUTES,
            transport_mode: mode,
        }
    }
}

/// Turn an allocation into a route plan.
///
/// The overall ETA is the maximum across legs: the operation is not
/// complete until the slowest leg arrives. An empty allocation yields an
/// empty plan with ETA 0.
pub fn plan_routes(
    request: &AllocationRequest,
    allocation: &AllocationResult,
    config: &RoutePlannerConfig,
) -> RoutePlan {
    let legs: Vec<RouteLeg> = allocation
        .assignments
        .iter()
        .map(|assignment| RouteLeg {
            eta_minutes: leg_eta_minutes(assignment.distance_km, config),
            assignment: assignment.clone(),
        })
        .collect();

    let overall_eta_minutes = legs
        .iter()
        .map(|leg| leg.eta_minutes)
        .fold(0.0_f64, f64::max);

    RoutePlan {
        disaster_id: request.disaster_id.clone(),
        resource_type: request.resource_type.clone(),
        legs,
        overall_eta_minutes,
    }
}

fn leg_eta_minutes(distance_km: f64, config: &RoutePlannerConfig) -> f64 {
    distance_km / config.assumed_speed_kmh * 60.0 + config.fixed_handling_minutes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::allocate;
    use crate::geo::Coordinate;
    use crate::models::SupplySource;
    use chrono::Utc;

    fn request(qty: u32) -> AllocationRequest {
        AllocationRequest {
            disaster_id: "D1".to_string(),
            resource_type: "water".to_string(),
            required_quantity: qty,
            target: Coordinate::new(0.0, 0.0),
        }
    }

    fn source(id: i64, lat: f64, lon: f64, qty: u32) -> SupplySource {
        SupplySource {
            id,
            name: format!("warehouse-{id}"),
            coordinate: Coordinate::new(lat, lon),
            resource_type: "water".to_string(),
            available_quantity: qty,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn eta_is_distance_over_speed_plus_handling() {
        // 1 degree of longitude on the equator is ~111.19km
        let req = request(100);
        let allocation = allocate(&req, &[source(1, 0.0, 1.0, 100)]).unwrap();

        let plan = plan_routes(&req, &allocation, &RoutePlannerConfig::default());

        assert_eq!(plan.legs.len(), 1);
        let expected = 111.19 / 60.0 * 60.0 + 30.0;
        assert!((plan.legs[0].eta_minutes - expected).abs() < 0.5);
        assert_eq!(plan.overall_eta_minutes, plan.legs[0].eta_minutes);
    }

    #[test]
    fn same_point_route_costs_only_handling_time() {
        let req = request(10);
        let allocation = allocate(&req, &[source(1, 0.0, 0.0, 10)]).unwrap();

        let plan = plan_routes(&req, &allocation, &RoutePlannerConfig::default());

        assert!((plan.overall_eta_minutes - DEFAULT_HANDLING_MINUTES).abs() < 1e-9);
    }

    #[test]
    fn overall_eta_is_slowest_leg_not_sum() {
        let req = request(200);
        let allocation = allocate(
            &req,
            &[source(1, 0.0, 0.45, 100), source(2, 0.0, 1.08, 100)],
        )
        .unwrap();

        let plan = plan_routes(&req, &allocation, &RoutePlannerConfig::default());

        assert_eq!(plan.legs.len(), 2);
        let slowest = plan
            .legs
            .iter()
            .map(|l| l.eta_minutes)
            .fold(0.0_f64, f64::max);
        let sum: f64 = plan.legs.iter().map(|l| l.eta_minutes).sum();
        assert_eq!(plan.overall_eta_minutes, slowest);
        assert!(plan.overall_eta_minutes < sum);
    }

    #[test]
    fn empty_allocation_yields_empty_plan() {
        let req = request(50);
        let allocation = allocate(&req, &[]).unwrap();

        let plan = plan_routes(&req, &allocation, &RoutePlannerConfig::default());

        assert!(plan.legs.is_empty());
        assert_eq!(plan.overall_eta_minutes, 0.0);
    }

    #[test]
    fn air_mode_is_faster_than_ground() {
        let req = request(100);
        let allocation = allocate(&req, &[source(1, 0.0, 1.0, 100)]).unwrap();

        let ground = plan_routes(&req, &allocation, &RoutePlannerConfig::default());
        let air = plan_routes(
            &req,
            &allocation,
            &RoutePlannerConfig::for_mode(TransportMode::Air),
        );

        assert!(air.overall_eta_minutes < ground.overall_eta_minutes);
    }

    #[test]
    fn waypoints_are_source_then_target() {
        let req = request(10);
        let allocation = allocate(&req, &[source(1, 0.5, 0.5, 10)]).unwrap();

        let wps = &allocation.assignments[0].waypoints;
        assert_eq!(wps.len(), 2);
        assert_eq!(wps[0], Coordinate::new(0.5, 0.5));
        assert_eq!(wps[1], req.target);
    }
}
