//! Persistence for allocation results, route plans, and forecasts.
//!
//! Results are stored as JSON documents keyed by an integer id, the same
//! shape the operations dashboard reads back.

use anyhow::Result;
use chrono::Utc;
use relief_core::{AllocationResult, DemandEstimate, RoutePlan};
use sqlx::{Sqlite, SqlitePool};

/// Persist an allocation decision for audit within the caller's
/// transaction; returns its id. Durable only once the caller commits.
pub async fn save_allocation(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    disaster_id: &str,
    resource_type: &str,
    allocation: &AllocationResult,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO allocations (disaster_id, resource_type, result_data, created_at)
         VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(disaster_id)
    .bind(resource_type)
    .bind(serde_json::to_string(allocation)?)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut **tx)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Persist a route plan within the caller's transaction; returns its id.
pub async fn save_route_plan(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    plan: &RoutePlan,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO route_plans (disaster_id, resource_type, plan_data, created_at)
         VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(&plan.disaster_id)
    .bind(&plan.resource_type)
    .bind(serde_json::to_string(plan)?)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut **tx)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Load a route plan by id.
pub async fn load_route_plan(pool: &SqlitePool, id: i64) -> Result<Option<RoutePlan>> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT plan_data FROM route_plans WHERE id = ?1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    match row {
        Some((data,)) => Ok(Some(serde_json::from_str(&data)?)),
        None => Ok(None),
    }
}

/// Persist a demand forecast; returns its id.
pub async fn save_forecast(
    pool: &SqlitePool,
    disaster_id: &str,
    estimate: &DemandEstimate,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO forecasts (disaster_id, quantities, accuracy, created_at)
         VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(disaster_id)
    .bind(serde_json::to_string(&estimate.quantities)?)
    .bind(estimate.accuracy)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}
