//! Error taxonomy for dispatch operations.
//!
//! Partial fulfillment is intentionally absent: an allocation that cannot
//! cover the full requirement is a normal `AllocationResult` with
//! `unmet_quantity > 0`, not an error.

use crate::models::DroneStatus;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    /// Rejected before any state mutation; the caller must correct input.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Dispatch attempted against a drone that is not ready.
    #[error("drone {drone_id} unavailable (status {status})")]
    DroneUnavailable {
        drone_id: String,
        status: DroneStatus,
    },

    /// The inventory changed incompatibly since the snapshot was read;
    /// the caller re-runs allocation against a fresh snapshot.
    #[error("inventory snapshot is stale, re-run allocation")]
    InventorySnapshotStale,

    /// Two concurrent transitions raced on the same drone; re-read state
    /// before retrying.
    #[error("conflicting concurrent update on drone {drone_id}")]
    RegistryConflict { drone_id: String },
}
