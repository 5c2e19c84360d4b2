//! Server configuration from environment.

use relief_core::{RankingPolicy, RoutePlannerConfig, TransportMode};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_path: String,
    pub database_max_connections: u32,
    /// Telemetry tick interval in milliseconds.
    pub tick_interval_ms: u64,
    /// Battery percent lost per tick while airborne.
    pub battery_drain_per_tick: f64,
    /// Battery percent gained per tick while charging.
    pub battery_charge_per_tick: f64,
    /// Maximum simulated position jitter per tick, in degrees.
    pub position_jitter_deg: f64,
    pub transport_mode: TransportMode,
    pub assumed_speed_kmh: Option<f64>,
    pub fixed_handling_minutes: f64,
    pub ranking_policy: RankingPolicy,
    /// Seed a small demo fleet/inventory into an empty database.
    pub seed_demo_data: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server_port: parse_env("RELIEF_PORT").unwrap_or(3000),
            database_path: env::var("RELIEF_DB")
                .unwrap_or_else(|_| "data/relief.db".to_string()),
            database_max_connections: parse_env("RELIEF_DB_MAX_CONNECTIONS").unwrap_or(5),
            tick_interval_ms: parse_env("RELIEF_TICK_MS").unwrap_or(2000),
            battery_drain_per_tick: parse_env("RELIEF_BATTERY_DRAIN").unwrap_or(2.0),
            battery_charge_per_tick: parse_env("RELIEF_BATTERY_CHARGE").unwrap_or(5.0),
            position_jitter_deg: parse_env("RELIEF_POSITION_JITTER_DEG").unwrap_or(0.002),
            transport_mode: match env::var("RELIEF_TRANSPORT_MODE").as_deref() {
                Ok("air") => TransportMode::Air,
                Ok("water") => TransportMode::Water,
                _ => TransportMode::Ground,
            },
            assumed_speed_kmh: parse_env("RELIEF_SPEED_KMH"),
            fixed_handling_minutes: parse_env("RELIEF_HANDLING_MINUTES").unwrap_or(30.0),
            ranking_policy: match env::var("RELIEF_RANKING").as_deref() {
                Ok("recency") => RankingPolicy::Recency,
                _ => RankingPolicy::Distance,
            },
            seed_demo_data: env::var("RELIEF_SEED_DEMO")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }

    /// Route planner settings derived from config; an explicit speed
    /// override wins over the transport mode default.
    pub fn route_planner(&self) -> RoutePlannerConfig {
        let mut planner = RoutePlannerConfig::for_mode(self.transport_mode);
        if let Some(speed) = self.assumed_speed_kmh {
            planner.assumed_speed_kmh = speed;
        }
        planner.fixed_handling_minutes = self.fixed_handling_minutes;
        planner
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}
