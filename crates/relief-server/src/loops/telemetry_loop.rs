//! Telemetry loop.
//!
//! Advances every non-idle drone once per tick: airborne drones move and
//! drain battery, charging drones recover. The registry applies the
//! state-machine rules and publishes change notifications; this loop only
//! shuttles deltas from the telemetry source into it.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::interval;

use relief_core::DroneStatus;

use crate::state::AppState;
use crate::telemetry::TelemetrySource;

pub async fn run_telemetry_loop(
    state: Arc<AppState>,
    source: Arc<dyn TelemetrySource>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(Duration::from_millis(state.config().tick_interval_ms));

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Telemetry loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                tick_fleet(&state, source.as_ref());
            }
        }
    }
}

/// One tick over the whole fleet. Works on a read-snapshot; each drone's
/// mutation is serialized inside the registry.
pub fn tick_fleet(state: &AppState, source: &dyn TelemetrySource) {
    for drone in state.registry.active_drones() {
        if drone.status.is_moving() || drone.status == DroneStatus::Charging {
            let delta = source.sample(&drone);
            state.registry.apply_telemetry(&drone.id, delta);
        }
    }
}
