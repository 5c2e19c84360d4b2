//! Authoritative in-memory fleet state.
//!
//! Every drone record is owned by this registry and mutated only through
//! its transition API. Per-drone mutual exclusion comes from the DashMap
//! entry guard: a dispatch decision and a concurrent battery-triggered
//! auto-return can never interleave on the same drone. Change events are
//! published while the guard is still held, so subscribers see per-drone
//! updates in order.

use chrono::Utc;
use dashmap::DashMap;
use relief_core::{Coordinate, DispatchError, Drone, DroneStatus, Mission};
use tokio::sync::broadcast;

/// Battery threshold below which an airborne drone turns back.
pub const RETURN_BATTERY_PERCENT: f64 = 20.0;
/// Battery threshold below which a returning drone lands and charges.
pub const LAND_BATTERY_PERCENT: f64 = 5.0;
pub const FULL_BATTERY_PERCENT: f64 = 100.0;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Change notification for one drone. Best-effort fan-out; slow
/// subscribers may lag and miss intermediate snapshots.
#[derive(Debug, Clone)]
pub struct DroneEvent {
    pub drone: Drone,
}

/// Position/battery change produced by one telemetry tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct TelemetryDelta {
    pub d_lat: f64,
    pub d_lon: f64,
    pub battery_delta: f64,
}

pub struct FleetRegistry {
    drones: DashMap<String, Drone>,
    missions: DashMap<String, Mission>,
    events: broadcast::Sender<DroneEvent>,
}

impl Default for FleetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FleetRegistry {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            drones: DashMap::new(),
            missions: DashMap::new(),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DroneEvent> {
        self.events.subscribe()
    }

    /// Register a new drone, ready at full battery.
    pub fn register(&self, name: &str, max_capacity: u32, coordinate: Coordinate) -> Drone {
        let drone = Drone {
            id: format!("DRN-{}", &uuid::Uuid::new_v4().to_string()[..8].to_uppercase()),
            name: name.to_string(),
            max_capacity,
            status: DroneStatus::Ready,
            coordinate,
            battery_percent: FULL_BATTERY_PERCENT,
            current_mission_id: None,
            last_update: Utc::now(),
        };
        self.drones.insert(drone.id.clone(), drone.clone());
        self.publish(&drone);
        drone
    }

    /// Restore a persisted drone at startup without emitting an event.
    pub fn load(&self, drone: Drone) {
        self.drones.insert(drone.id.clone(), drone);
    }

    pub fn get(&self, drone_id: &str) -> Option<Drone> {
        self.drones.get(drone_id).map(|entry| entry.value().clone())
    }

    pub fn mission(&self, mission_id: &str) -> Option<Mission> {
        self.missions
            .get(mission_id)
            .map(|entry| entry.value().clone())
    }

    /// Read-snapshot of the whole fleet, sorted by id for stable output.
    /// Clones each record; never holds guards across other registry calls.
    pub fn snapshot(&self) -> Vec<Drone> {
        let mut drones: Vec<Drone> = self.drones.iter().map(|r| r.value().clone()).collect();
        drones.sort_by(|a, b| a.id.cmp(&b.id));
        drones
    }

    /// Fleet minus decommissioned drones (retained for audit only).
    pub fn active_drones(&self) -> Vec<Drone> {
        self.snapshot()
            .into_iter()
            .filter(|d| !d.status.is_terminal())
            .collect()
    }

    /// Lowest-id ready drone, for deterministic reservation.
    pub fn first_ready(&self) -> Option<Drone> {
        self.snapshot()
            .into_iter()
            .find(|d| d.status == DroneStatus::Ready)
    }

    /// Reserve a drone for a mission: `ready -> on-mission`.
    ///
    /// Fails `DroneUnavailable` if the drone is in any other state; the
    /// registry is left unchanged.
    pub fn dispatch_drone(
        &self,
        drone_id: &str,
        mission: Mission,
    ) -> Result<Drone, DispatchError> {
        self.commit_dispatch(drone_id, None, mission)
    }

    /// Reserve with an optimistic-concurrency check: `observed` is the
    /// status the caller read before deciding. If another transition
    /// committed in between, the caller gets `RegistryConflict` and must
    /// re-read before retrying.
    pub fn dispatch_drone_expecting(
        &self,
        drone_id: &str,
        observed: DroneStatus,
        mission: Mission,
    ) -> Result<Drone, DispatchError> {
        self.commit_dispatch(drone_id, Some(observed), mission)
    }

    fn commit_dispatch(
        &self,
        drone_id: &str,
        observed: Option<DroneStatus>,
        mission: Mission,
    ) -> Result<Drone, DispatchError> {
        let mut entry = self
            .drones
            .get_mut(drone_id)
            .ok_or_else(|| DispatchError::InvalidRequest(format!("unknown drone {drone_id}")))?;
        let drone = entry.value_mut();

        if let Some(observed) = observed {
            if drone.status != observed {
                return Err(DispatchError::RegistryConflict {
                    drone_id: drone_id.to_string(),
                });
            }
        }
        if drone.status != DroneStatus::Ready {
            return Err(DispatchError::DroneUnavailable {
                drone_id: drone_id.to_string(),
                status: drone.status,
            });
        }

        drone.status = DroneStatus::OnMission;
        drone.current_mission_id = Some(mission.id.clone());
        drone.last_update = Utc::now();
        self.missions.insert(mission.id.clone(), mission);

        let snapshot = drone.clone();
        self.publish(&snapshot);
        Ok(snapshot)
    }

    /// Undo a dispatch reservation whose surrounding work failed to
    /// commit: `on-mission -> ready`, discarding the mission record.
    /// No-op unless the drone is on-mission.
    pub fn release_drone(&self, drone_id: &str) {
        let Some(mut entry) = self.drones.get_mut(drone_id) else {
            return;
        };
        let drone = entry.value_mut();
        if drone.status != DroneStatus::OnMission {
            return;
        }

        drone.status = DroneStatus::Ready;
        if let Some(mission_id) = drone.current_mission_id.take() {
            self.missions.remove(&mission_id);
        }
        drone.last_update = Utc::now();
        let snapshot = drone.clone();
        self.publish(&snapshot);
    }

    /// Apply one telemetry tick to a drone and run the automatic
    /// state-machine rules.
    ///
    /// Position only moves while on-mission/returning; charging raises
    /// battery and never moves the drone; battery is clamped to [0,100].
    /// Returns the updated snapshot, or None if the drone was idle or
    /// unknown.
    pub fn apply_telemetry(&self, drone_id: &str, delta: TelemetryDelta) -> Option<Drone> {
        let mut entry = self.drones.get_mut(drone_id)?;
        let drone = entry.value_mut();

        match drone.status {
            status if status.is_moving() => {
                drone.coordinate.lat += delta.d_lat;
                drone.coordinate.lon += delta.d_lon;
                drone.battery_percent =
                    (drone.battery_percent + delta.battery_delta).clamp(0.0, 100.0);
            }
            DroneStatus::Charging => {
                // Landed: battery can only rise, position stays put.
                drone.battery_percent =
                    (drone.battery_percent + delta.battery_delta.max(0.0)).clamp(0.0, 100.0);
            }
            _ => return None,
        }

        match drone.status {
            DroneStatus::OnMission if drone.battery_percent < RETURN_BATTERY_PERCENT => {
                drone.status = DroneStatus::Returning;
            }
            DroneStatus::Returning if drone.battery_percent < LAND_BATTERY_PERCENT => {
                drone.status = DroneStatus::Charging;
            }
            DroneStatus::Charging if drone.battery_percent >= FULL_BATTERY_PERCENT => {
                drone.status = DroneStatus::Ready;
                self.close_mission(drone);
            }
            _ => {}
        }

        drone.last_update = Utc::now();
        let snapshot = drone.clone();
        self.publish(&snapshot);
        Some(snapshot)
    }

    /// Operator emergency stop; legal for any drone that is airborne.
    pub fn emergency_stop(&self, drone_id: &str) -> Result<Drone, DispatchError> {
        self.transition(drone_id, DroneStatus::Emergency, false)
    }

    /// Clear an emergency after operator intervention; closes the mission.
    pub fn resolve_emergency(&self, drone_id: &str) -> Result<Drone, DispatchError> {
        let mut entry = self
            .drones
            .get_mut(drone_id)
            .ok_or_else(|| DispatchError::InvalidRequest(format!("unknown drone {drone_id}")))?;
        let drone = entry.value_mut();

        if drone.status != DroneStatus::Emergency {
            return Err(DispatchError::InvalidRequest(format!(
                "drone {drone_id} is not in emergency (status {})",
                drone.status
            )));
        }

        drone.status = DroneStatus::Ready;
        self.close_mission(drone);
        drone.last_update = Utc::now();
        let snapshot = drone.clone();
        self.publish(&snapshot);
        Ok(snapshot)
    }

    /// Remove a drone from rotation permanently. The record is kept for
    /// audit and still appears in `snapshot()`.
    pub fn decommission(&self, drone_id: &str) -> Result<Drone, DispatchError> {
        self.transition(drone_id, DroneStatus::Decommissioned, true)
    }

    fn transition(
        &self,
        drone_id: &str,
        next: DroneStatus,
        close_mission: bool,
    ) -> Result<Drone, DispatchError> {
        let mut entry = self
            .drones
            .get_mut(drone_id)
            .ok_or_else(|| DispatchError::InvalidRequest(format!("unknown drone {drone_id}")))?;
        let drone = entry.value_mut();

        if !drone.status.can_transition_to(next) {
            return Err(DispatchError::InvalidRequest(format!(
                "cannot move drone {drone_id} from {} to {next}",
                drone.status
            )));
        }

        drone.status = next;
        if close_mission {
            self.close_mission(drone);
        }
        drone.last_update = Utc::now();
        let snapshot = drone.clone();
        self.publish(&snapshot);
        Ok(snapshot)
    }

    fn close_mission(&self, drone: &mut Drone) {
        if let Some(mission_id) = drone.current_mission_id.take() {
            if let Some(mut mission) = self.missions.get_mut(&mission_id) {
                mission.ended_at = Some(Utc::now());
            }
        }
    }

    fn publish(&self, drone: &Drone) {
        // No subscribers is fine; delivery is best-effort.
        let _ = self.events.send(DroneEvent {
            drone: drone.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_drone(status: DroneStatus, battery: f64) -> (FleetRegistry, String) {
        let registry = FleetRegistry::new();
        let drone = registry.register("unit-1", 50, Coordinate::new(0.0, 0.0));
        {
            let mut entry = registry.drones.get_mut(&drone.id).unwrap();
            entry.status = status;
            entry.battery_percent = battery;
        }
        (registry, drone.id)
    }

    fn mission_for(drone_id: &str) -> Mission {
        Mission {
            id: format!("MSN-{drone_id}"),
            drone_id: drone_id.to_string(),
            disaster_id: "D1".to_string(),
            route_plan_id: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    #[test]
    fn dispatch_requires_ready() {
        let (registry, id) = registry_with_drone(DroneStatus::OnMission, 80.0);

        let err = registry.dispatch_drone(&id, mission_for(&id)).unwrap_err();
        assert_eq!(
            err,
            DispatchError::DroneUnavailable {
                drone_id: id.clone(),
                status: DroneStatus::OnMission,
            }
        );
        // Registry unchanged
        assert_eq!(registry.get(&id).unwrap().status, DroneStatus::OnMission);
    }

    #[test]
    fn dispatch_commits_mission() {
        let (registry, id) = registry_with_drone(DroneStatus::Ready, 100.0);

        let drone = registry.dispatch_drone(&id, mission_for(&id)).unwrap();
        assert_eq!(drone.status, DroneStatus::OnMission);
        let mission_id = drone.current_mission_id.unwrap();
        assert!(registry.mission(&mission_id).unwrap().ended_at.is_none());
    }

    #[test]
    fn release_undoes_a_dispatch_reservation() {
        let (registry, id) = registry_with_drone(DroneStatus::Ready, 100.0);
        let drone = registry.dispatch_drone(&id, mission_for(&id)).unwrap();
        let mission_id = drone.current_mission_id.unwrap();

        registry.release_drone(&id);

        let drone = registry.get(&id).unwrap();
        assert_eq!(drone.status, DroneStatus::Ready);
        assert!(drone.current_mission_id.is_none());
        assert!(registry.mission(&mission_id).is_none());
        // Dispatchable again
        assert!(registry.dispatch_drone(&id, mission_for(&id)).is_ok());
    }

    #[test]
    fn release_leaves_airborne_telemetry_states_alone() {
        let (registry, id) = registry_with_drone(DroneStatus::Returning, 15.0);
        registry.release_drone(&id);
        assert_eq!(registry.get(&id).unwrap().status, DroneStatus::Returning);
    }

    #[test]
    fn stale_observation_is_a_registry_conflict() {
        let (registry, id) = registry_with_drone(DroneStatus::Ready, 100.0);
        registry.dispatch_drone(&id, mission_for(&id)).unwrap();

        // A second dispatcher that read "ready" before the first commit
        let err = registry
            .dispatch_drone_expecting(&id, DroneStatus::Ready, mission_for("other"))
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::RegistryConflict {
                drone_id: id.clone()
            }
        );
    }

    #[test]
    fn low_battery_forces_return() {
        let (registry, id) = registry_with_drone(DroneStatus::OnMission, 21.0);

        let drone = registry
            .apply_telemetry(
                &id,
                TelemetryDelta {
                    d_lat: 0.001,
                    d_lon: 0.0,
                    battery_delta: -2.0,
                },
            )
            .unwrap();

        assert_eq!(drone.battery_percent, 19.0);
        assert_eq!(drone.status, DroneStatus::Returning);
    }

    #[test]
    fn returning_drone_lands_to_charge() {
        let (registry, id) = registry_with_drone(DroneStatus::Returning, 6.0);

        let drone = registry
            .apply_telemetry(
                &id,
                TelemetryDelta {
                    d_lat: 0.0,
                    d_lon: -0.001,
                    battery_delta: -2.0,
                },
            )
            .unwrap();

        assert_eq!(drone.status, DroneStatus::Charging);
    }

    #[test]
    fn full_charge_returns_to_ready_and_closes_mission() {
        let (registry, id) = registry_with_drone(DroneStatus::Ready, 100.0);
        let dispatched = registry.dispatch_drone(&id, mission_for(&id)).unwrap();
        let mission_id = dispatched.current_mission_id.clone().unwrap();
        {
            let mut entry = registry.drones.get_mut(&id).unwrap();
            entry.status = DroneStatus::Charging;
            entry.battery_percent = 97.0;
        }

        let drone = registry
            .apply_telemetry(
                &id,
                TelemetryDelta {
                    battery_delta: 5.0,
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(drone.status, DroneStatus::Ready);
        assert_eq!(drone.battery_percent, 100.0);
        assert!(drone.current_mission_id.is_none());
        assert!(registry.mission(&mission_id).unwrap().ended_at.is_some());
    }

    #[test]
    fn battery_stays_in_bounds() {
        let (registry, id) = registry_with_drone(DroneStatus::Returning, 1.0);
        let drone = registry
            .apply_telemetry(
                &id,
                TelemetryDelta {
                    battery_delta: -10.0,
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(drone.battery_percent, 0.0);

        let (registry, id) = registry_with_drone(DroneStatus::Charging, 99.0);
        let drone = registry
            .apply_telemetry(
                &id,
                TelemetryDelta {
                    battery_delta: 50.0,
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(drone.battery_percent, 100.0);
    }

    #[test]
    fn idle_drone_never_moves() {
        let (registry, id) = registry_with_drone(DroneStatus::Ready, 100.0);
        let before = registry.get(&id).unwrap().coordinate;

        let result = registry.apply_telemetry(
            &id,
            TelemetryDelta {
                d_lat: 0.5,
                d_lon: 0.5,
                battery_delta: -2.0,
            },
        );

        assert!(result.is_none());
        assert_eq!(registry.get(&id).unwrap().coordinate, before);
    }

    #[test]
    fn charging_drone_holds_position() {
        let (registry, id) = registry_with_drone(DroneStatus::Charging, 40.0);
        let before = registry.get(&id).unwrap().coordinate;

        let drone = registry
            .apply_telemetry(
                &id,
                TelemetryDelta {
                    d_lat: 0.5,
                    d_lon: 0.5,
                    battery_delta: 5.0,
                },
            )
            .unwrap();

        assert_eq!(drone.coordinate, before);
        assert_eq!(drone.battery_percent, 45.0);
    }

    #[test]
    fn emergency_stop_only_while_airborne() {
        let (registry, id) = registry_with_drone(DroneStatus::OnMission, 60.0);
        assert_eq!(
            registry.emergency_stop(&id).unwrap().status,
            DroneStatus::Emergency
        );

        let (registry, id) = registry_with_drone(DroneStatus::Ready, 100.0);
        assert!(matches!(
            registry.emergency_stop(&id),
            Err(DispatchError::InvalidRequest(_))
        ));

        let (registry, id) = registry_with_drone(DroneStatus::Charging, 50.0);
        assert!(registry.emergency_stop(&id).is_err());
    }

    #[test]
    fn decommission_is_terminal() {
        let (registry, id) = registry_with_drone(DroneStatus::Ready, 100.0);
        registry.decommission(&id).unwrap();

        assert!(registry.dispatch_drone(&id, mission_for(&id)).is_err());
        assert!(registry.decommission(&id).is_err());
        // Retained for audit, excluded from rotation
        assert_eq!(registry.snapshot().len(), 1);
        assert!(registry.active_drones().is_empty());
        assert!(registry.first_ready().is_none());
    }

    #[test]
    fn events_preserve_per_drone_order() {
        let (registry, id) = registry_with_drone(DroneStatus::OnMission, 22.0);
        let mut rx = registry.subscribe();

        for _ in 0..3 {
            registry.apply_telemetry(
                &id,
                TelemetryDelta {
                    battery_delta: -2.0,
                    ..Default::default()
                },
            );
        }

        let mut batteries = Vec::new();
        while let Ok(event) = rx.try_recv() {
            batteries.push(event.drone.battery_percent);
        }
        assert_eq!(batteries, vec![20.0, 18.0, 16.0]);
    }
}
