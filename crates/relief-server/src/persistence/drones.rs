//! Drone snapshot persistence.

use anyhow::Result;
use chrono::{DateTime, Utc};
use relief_core::{Coordinate, Drone, DroneStatus};
use sqlx::{Sqlite, SqlitePool};

/// Upsert a drone snapshot.
pub async fn upsert_drone(pool: &SqlitePool, drone: &Drone) -> Result<()> {
    sqlx::query(UPSERT_SQL)
        .bind(&drone.id)
        .bind(&drone.name)
        .bind(drone.max_capacity as i64)
        .bind(drone.status.to_string())
        .bind(drone.coordinate.lat)
        .bind(drone.coordinate.lon)
        .bind(drone.battery_percent)
        .bind(&drone.current_mission_id)
        .bind(drone.last_update.to_rfc3339())
        .execute(pool)
        .await?;
    Ok(())
}

/// Upsert a drone snapshot within an existing transaction.
pub async fn upsert_drone_tx(tx: &mut sqlx::Transaction<'_, Sqlite>, drone: &Drone) -> Result<()> {
    sqlx::query(UPSERT_SQL)
        .bind(&drone.id)
        .bind(&drone.name)
        .bind(drone.max_capacity as i64)
        .bind(drone.status.to_string())
        .bind(drone.coordinate.lat)
        .bind(drone.coordinate.lon)
        .bind(drone.battery_percent)
        .bind(&drone.current_mission_id)
        .bind(drone.last_update.to_rfc3339())
        .execute(&mut **tx)
        .await?;
    Ok(())
}

const UPSERT_SQL: &str = r#"
    INSERT INTO drones (id, name, max_capacity, status, lat, lon, battery_percent, current_mission_id, last_update)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
    ON CONFLICT(id) DO UPDATE SET
        name = ?2, max_capacity = ?3, status = ?4,
        lat = ?5, lon = ?6, battery_percent = ?7,
        current_mission_id = ?8, last_update = ?9
"#;

/// Load the whole fleet from the database.
pub async fn load_all_drones(pool: &SqlitePool) -> Result<Vec<Drone>> {
    let rows = sqlx::query_as::<_, DroneRow>(
        "SELECT id, name, max_capacity, status, lat, lon, battery_percent, current_mission_id, last_update FROM drones",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct DroneRow {
    id: String,
    name: String,
    max_capacity: i64,
    status: String,
    lat: f64,
    lon: f64,
    battery_percent: f64,
    current_mission_id: Option<String>,
    last_update: String,
}

impl From<DroneRow> for Drone {
    fn from(row: DroneRow) -> Self {
        let status = match row.status.as_str() {
            "ready" => DroneStatus::Ready,
            "charging" => DroneStatus::Charging,
            "on-mission" => DroneStatus::OnMission,
            "returning" => DroneStatus::Returning,
            "emergency" => DroneStatus::Emergency,
            _ => DroneStatus::Decommissioned,
        };

        let last_update = DateTime::parse_from_rfc3339(&row.last_update)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Drone {
            id: row.id,
            name: row.name,
            max_capacity: row.max_capacity.max(0) as u32,
            status,
            coordinate: Coordinate::new(row.lat, row.lon),
            battery_percent: row.battery_percent.clamp(0.0, 100.0),
            current_mission_id: row.current_mission_id,
            last_update,
        }
    }
}
