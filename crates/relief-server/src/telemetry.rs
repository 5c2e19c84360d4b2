//! Telemetry ingestion collaborator seam.
//!
//! Production would feed real position/battery reports through this trait;
//! the in-repo implementation synthesizes a bounded random walk so the
//! state machine and notification contract can run end to end.

use rand::Rng;
use relief_core::{Drone, DroneStatus};

use crate::state::TelemetryDelta;

pub trait TelemetrySource: Send + Sync {
    /// Produce the position/battery change for one drone for one tick.
    fn sample(&self, drone: &Drone) -> TelemetryDelta;
}

/// Random-walk simulation: airborne drones jitter by a bounded delta and
/// drain battery; charging drones gain battery and stay put.
pub struct SimulatedTelemetry {
    pub jitter_deg: f64,
    pub drain_per_tick: f64,
    pub charge_per_tick: f64,
}

impl SimulatedTelemetry {
    pub fn new(jitter_deg: f64, drain_per_tick: f64, charge_per_tick: f64) -> Self {
        Self {
            jitter_deg,
            drain_per_tick,
            charge_per_tick,
        }
    }
}

impl TelemetrySource for SimulatedTelemetry {
    fn sample(&self, drone: &Drone) -> TelemetryDelta {
        if drone.status == DroneStatus::Charging {
            return TelemetryDelta {
                battery_delta: self.charge_per_tick,
                ..Default::default()
            };
        }

        let mut rng = rand::rng();
        TelemetryDelta {
            d_lat: rng.random_range(-self.jitter_deg..=self.jitter_deg),
            d_lon: rng.random_range(-self.jitter_deg..=self.jitter_deg),
            battery_delta: -self.drain_per_tick,
        }
    }
}
