//! Demo data seeding for local development (RELIEF_SEED_DEMO=1).

use anyhow::Result;
use relief_core::Coordinate;
use tracing::info;

use crate::persistence::{disasters, inventory};
use crate::state::AppState;

/// Seed a small demo scenario into an empty deployment: two disaster
/// sites, three stocked warehouses, and two ready drones.
pub async fn seed_demo_data(state: &AppState) -> Result<()> {
    let pool = state.db().pool();

    let existing: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM warehouses")
        .fetch_one(pool)
        .await?;
    if existing.0 > 0 {
        info!("Demo seed skipped, database already has data");
        return Ok(());
    }

    disasters::insert_disaster(pool, "D-FLOOD-01", "River flood", Coordinate::new(29.76, -95.37))
        .await?;
    disasters::insert_disaster(pool, "D-QUAKE-01", "Earthquake", Coordinate::new(34.05, -118.24))
        .await?;

    let depots = [
        ("Central depot", Coordinate::new(30.27, -97.74)),
        ("Coastal depot", Coordinate::new(29.30, -94.80)),
        ("Inland depot", Coordinate::new(32.78, -96.80)),
    ];
    for (name, coordinate) in depots {
        let id = inventory::insert_warehouse(pool, name, coordinate).await?;
        inventory::upsert_stock(pool, id, "water", 500).await?;
        inventory::upsert_stock(pool, id, "food", 300).await?;
        inventory::upsert_stock(pool, id, "medical", 80).await?;
    }

    if state.registry.snapshot().is_empty() {
        state.registry.register("hawk-1", 40, Coordinate::new(30.27, -97.74));
        state.registry.register("hawk-2", 40, Coordinate::new(29.30, -94.80));
    }

    info!("Demo data seeded");
    Ok(())
}
