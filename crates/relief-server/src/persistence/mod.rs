//! SQLite-backed implementations of the storage collaborators.

pub mod db;
pub mod disasters;
pub mod drones;
pub mod inventory;
pub mod plans;

pub use db::{init_database, Database};
