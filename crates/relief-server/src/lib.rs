//! Shared library surface for the relief dispatch server and its tests.

pub mod api;
pub mod backoff;
pub mod config;
pub mod dispatch;
pub mod forecast;
pub mod loops;
pub mod persistence;
pub mod seed;
pub mod state;
pub mod telemetry;
