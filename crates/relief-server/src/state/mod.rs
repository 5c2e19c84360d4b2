//! Server state: the fleet registry plus shared handles.

mod registry;

pub use registry::{
    DroneEvent, FleetRegistry, TelemetryDelta, FULL_BATTERY_PERCENT, LAND_BATTERY_PERCENT,
    RETURN_BATTERY_PERCENT,
};

use std::sync::Arc;

use crate::config::Config;
use crate::forecast::{BaselineForecaster, DemandForecaster};
use crate::persistence::Database;

/// Application state shared across API handlers and loops.
pub struct AppState {
    pub registry: FleetRegistry,
    db: Database,
    config: Config,
    forecaster: Arc<dyn DemandForecaster + Send + Sync>,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        Self {
            registry: FleetRegistry::new(),
            db,
            config,
            forecaster: Arc::new(BaselineForecaster::default()),
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn forecaster(&self) -> &(dyn DemandForecaster + Send + Sync) {
        self.forecaster.as_ref()
    }

    /// Restore the persisted fleet into the registry at startup.
    pub async fn load_fleet(&self) -> anyhow::Result<usize> {
        let drones = crate::persistence::drones::load_all_drones(self.db.pool()).await?;
        let count = drones.len();
        for drone in drones {
            self.registry.load(drone);
        }
        Ok(count)
    }

    /// Flush the registry snapshot to the database (shutdown drain).
    pub async fn flush_fleet(&self) -> anyhow::Result<()> {
        for drone in self.registry.snapshot() {
            crate::persistence::drones::upsert_drone(self.db.pool(), &drone).await?;
        }
        Ok(())
    }
}
