pub mod allocator;
pub mod error;
pub mod geo;
pub mod models;
pub mod route_planner;

pub use allocator::{allocate, allocate_with_policy, rank_sources, RankingPolicy};
pub use error::DispatchError;
pub use geo::{distance_km, Coordinate};
pub use models::{
    AllocationRequest, AllocationResult, Assignment, DemandEstimate, Drone, DroneStatus, Mission,
    RouteLeg, RoutePlan, SupplySource,
};
pub use route_planner::{plan_routes, RoutePlannerConfig, TransportMode};
