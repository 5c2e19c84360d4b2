//! Inventory collaborator: snapshot reads and optimistic reservations.

use anyhow::Result;
use chrono::{DateTime, Utc};
use relief_core::{AllocationResult, Coordinate, SupplySource};
use sqlx::{Sqlite, SqlitePool};

/// Outcome of a reservation attempt against a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveStatus {
    Reserved,
    /// The inventory moved under the snapshot; the caller re-runs
    /// allocation against a fresh read.
    Stale,
}

/// Point-in-time snapshot of all sources carrying a resource type.
///
/// A single SELECT, so the rows are internally consistent; this is the
/// transaction boundary the allocator relies on.
pub async fn list_sources(pool: &SqlitePool, resource_type: &str) -> Result<Vec<SupplySource>> {
    let rows = sqlx::query_as::<_, SourceRow>(
        r#"
        SELECT w.id, w.name, w.lat, w.lon, i.item_type, i.quantity, i.updated_at
        FROM warehouses w
        JOIN inventory i ON w.id = i.warehouse_id
        WHERE i.item_type = ?1 AND i.quantity > 0 AND w.status = 'active'
        ORDER BY w.id
        "#,
    )
    .bind(resource_type)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Reserve the allocated quantities inside the caller's transaction,
/// checking each drawn source against the snapshot it was allocated from.
///
/// If any source's `updated_at` moved since the snapshot (or its quantity
/// no longer covers the draw), `Stale` is returned and the caller rolls
/// the transaction back. Nothing is durable until the caller commits.
pub async fn reserve_in(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    allocation: &AllocationResult,
    snapshot: &[SupplySource],
) -> Result<ReserveStatus> {
    let now = Utc::now().to_rfc3339();

    for assignment in &allocation.assignments {
        let Some(source) = snapshot.iter().find(|s| s.id == assignment.source_id) else {
            return Ok(ReserveStatus::Stale);
        };

        let updated = sqlx::query(
            r#"
            UPDATE inventory
            SET quantity = quantity - ?1, updated_at = ?2
            WHERE warehouse_id = ?3 AND item_type = ?4
              AND quantity >= ?1 AND updated_at = ?5
            "#,
        )
        .bind(assignment.quantity as i64)
        .bind(&now)
        .bind(assignment.source_id)
        .bind(&source.resource_type)
        .bind(source.last_updated.to_rfc3339())
        .execute(&mut **tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(ReserveStatus::Stale);
        }
    }

    Ok(ReserveStatus::Reserved)
}

/// Insert a warehouse; returns its id. Used for seeding and tests.
pub async fn insert_warehouse(
    pool: &SqlitePool,
    name: &str,
    coordinate: Coordinate,
) -> Result<i64> {
    let result = sqlx::query("INSERT INTO warehouses (name, lat, lon, status) VALUES (?1, ?2, ?3, 'active')")
        .bind(name)
        .bind(coordinate.lat)
        .bind(coordinate.lon)
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

/// Set stock for a warehouse/resource pair.
pub async fn upsert_stock(
    pool: &SqlitePool,
    warehouse_id: i64,
    resource_type: &str,
    quantity: u32,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO inventory (warehouse_id, item_type, quantity, updated_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(warehouse_id, item_type) DO UPDATE SET
            quantity = ?3, updated_at = ?4
        "#,
    )
    .bind(warehouse_id)
    .bind(resource_type)
    .bind(quantity as i64)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct SourceRow {
    id: i64,
    name: String,
    lat: f64,
    lon: f64,
    item_type: String,
    quantity: i64,
    updated_at: String,
}

impl From<SourceRow> for SupplySource {
    fn from(row: SourceRow) -> Self {
        let last_updated = DateTime::parse_from_rfc3339(&row.updated_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        SupplySource {
            id: row.id,
            name: row.name,
            coordinate: Coordinate::new(row.lat, row.lon),
            resource_type: row.item_type,
            available_quantity: row.quantity.max(0) as u32,
            last_updated,
        }
    }
}
