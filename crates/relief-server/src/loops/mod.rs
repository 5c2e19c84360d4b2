//! Background loops for continuous processing.

pub mod fleet_persist_loop;
pub mod telemetry_loop;
