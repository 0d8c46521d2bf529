//! Server configuration from environment.

use anyhow::{Context, Result};
use roadmesh_core::NetworkRules;
use roadmesh_routing::RoutingConfig;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_path: String,
    pub database_max_connections: u32,
    pub rules: NetworkRules,
    pub routing: RoutingConfig,
    pub log_json: bool,
}

impl Config {
    /// Defaults for everything except the network rules.
    pub fn new(rules: NetworkRules) -> Self {
        Self {
            server_port: 3000,
            database_path: "data/roadmesh.db".to_string(),
            database_max_connections: 4,
            rules,
            routing: RoutingConfig::default(),
            log_json: false,
        }
    }

    /// Fails when `ROADMESH_OFF_NETWORK_THRESHOLD_M` is missing or any rule
    /// is out of range.
    pub fn from_env() -> Result<Self> {
        let threshold: f64 = env::var("ROADMESH_OFF_NETWORK_THRESHOLD_M")
            .context("ROADMESH_OFF_NETWORK_THRESHOLD_M must be set (meters)")?
            .parse()
            .context("ROADMESH_OFF_NETWORK_THRESHOLD_M is not a number")?;

        let mut rules = NetworkRules::new(threshold);
        if let Some(radius) = parse_var("ROADMESH_STITCH_RADIUS_M") {
            rules = rules.with_stitch_radius(radius);
        }
        if let Some(neighbors) = parse_var("ROADMESH_MAX_STITCH_NEIGHBORS") {
            rules = rules.with_max_stitch_neighbors(neighbors);
        }
        if let Some(prefer) = parse_var("ROADMESH_PREFER_MAIN_ROUTE") {
            rules = rules.with_prefer_main_route(prefer);
        }
        rules.validate()?;

        let mut config = Self::new(rules);
        if let Some(port) = parse_var("ROADMESH_PORT") {
            config.server_port = port;
        }
        if let Ok(path) = env::var("ROADMESH_DATABASE_PATH") {
            config.database_path = path;
        }
        if let Some(max) = parse_var("ROADMESH_DATABASE_MAX_CONNECTIONS") {
            config.database_max_connections = max;
        }
        config.routing = RoutingConfig::from_env();
        config.log_json = env::var("ROADMESH_LOG_JSON")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.parse().ok())
}
