//! Disaster directory collaborator: location lookups.

use anyhow::Result;
use relief_core::Coordinate;
use sqlx::SqlitePool;

/// Look up a disaster's site coordinate.
pub async fn get_location(pool: &SqlitePool, disaster_id: &str) -> Result<Option<Coordinate>> {
    let row: Option<(f64, f64)> =
        sqlx::query_as("SELECT lat, lon FROM disasters WHERE id = ?1")
            .bind(disaster_id)
            .fetch_optional(pool)
            .await?;

    Ok(row.map(|(lat, lon)| Coordinate::new(lat, lon)))
}

/// Register a disaster site. Used for seeding and tests.
pub async fn insert_disaster(
    pool: &SqlitePool,
    disaster_id: &str,
    name: &str,
    coordinate: Coordinate,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO disasters (id, name, lat, lon) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET name = ?2, lat = ?3, lon = ?4",
    )
    .bind(disaster_id)
    .bind(name)
    .bind(coordinate.lat)
    .bind(coordinate.lon)
    .execute(pool)
    .await?;
    Ok(())
}
