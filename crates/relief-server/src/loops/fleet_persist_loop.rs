//! Fleet persistence loop.
//!
//! Coalesces high-frequency drone change events into periodic DB writes.
//! Missed events (a lagged subscriber) are recovered by merging a full
//! registry snapshot, since the latest state per drone is all that needs
//! to survive.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::broadcast;
use tokio::time::interval;

use relief_core::Drone;

use crate::backoff::Backoff;
use crate::persistence::{drones as drones_db, Database};
use crate::state::AppState;

const FLUSH_INTERVAL_SECS: u64 = 1;
const DB_BACKOFF_MAX_SECS: u64 = 30;

pub async fn run_fleet_persist_loop(
    db: Database,
    state: Arc<AppState>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut events = state.registry.subscribe();
    let mut ticker = interval(Duration::from_secs(FLUSH_INTERVAL_SECS));
    let mut backoff = Backoff::new(
        Duration::from_secs(FLUSH_INTERVAL_SECS),
        Duration::from_secs(DB_BACKOFF_MAX_SECS),
    );
    let mut pending: HashMap<String, Drone> = HashMap::new();

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Fleet persistence loop shutting down");
                break;
            }
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        pending.insert(event.drone.id.clone(), event.drone);
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!("Fleet persist lagged {missed} events, merging snapshot");
                        for drone in state.registry.snapshot() {
                            pending.insert(drone.id.clone(), drone);
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = ticker.tick() => {
                if !backoff.ready() {
                    continue;
                }
                match flush_pending(&db, &mut pending).await {
                    Ok(()) => backoff.success(),
                    Err(err) => {
                        let delay = backoff.failure();
                        tracing::warn!(
                            "Fleet persistence flush failed: {} (backing off {:?})",
                            err,
                            delay
                        );
                    }
                }
            }
        }
    }

    if let Err(err) = flush_pending(&db, &mut pending).await {
        tracing::warn!("Fleet persistence final flush failed: {}", err);
    }
}

async fn flush_pending(db: &Database, pending: &mut HashMap<String, Drone>) -> Result<()> {
    if pending.is_empty() {
        return Ok(());
    }

    let batch = std::mem::take(pending);
    let mut tx = match db.pool().begin().await {
        Ok(tx) => tx,
        Err(err) => {
            pending.extend(batch);
            return Err(err.into());
        }
    };

    let mut write_error: Option<anyhow::Error> = None;
    for drone in batch.values() {
        if let Err(err) = drones_db::upsert_drone_tx(&mut tx, drone).await {
            write_error = Some(err);
            break;
        }
    }

    if let Some(err) = write_error {
        tx.rollback().await.ok();
        pending.extend(batch);
        return Err(err);
    }

    if let Err(err) = tx.commit().await {
        pending.extend(batch);
        return Err(err.into());
    }

    Ok(())
}
