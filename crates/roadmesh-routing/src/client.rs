//! Routing service HTTP client.

use reqwest::Client;
use roadmesh_core::Coordinate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::error::{Result, RoutingError};
use crate::response::{parse_route_response, RouteResponse};

pub const DEFAULT_ROUTING_URL: &str = "https://api.geoapify.com/v1/routing";

/// Connection settings for a Geoapify-compatible routing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingConfig {
    pub base_url: String,
    pub api_key: String,
    /// Travel mode passed through to the service
    pub mode: String,
    pub timeout_s: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ROUTING_URL.to_string(),
            api_key: String::new(),
            mode: "drive".to_string(),
            timeout_s: 10,
        }
    }
}

impl RoutingConfig {
    /// Read `ROUTING_URL`, `ROUTING_API_KEY`, `ROUTING_MODE` and
    /// `ROUTING_TIMEOUT_S`, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("ROUTING_URL").unwrap_or(defaults.base_url),
            api_key: std::env::var("ROUTING_API_KEY").unwrap_or(defaults.api_key),
            mode: std::env::var("ROUTING_MODE").unwrap_or(defaults.mode),
            timeout_s: std::env::var("ROUTING_TIMEOUT_S")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.timeout_s),
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// `lat,lon|lat,lon|...` as the service expects.
pub fn waypoints_param(waypoints: &[Coordinate]) -> String {
    waypoints
        .iter()
        .map(|point| format!("{},{}", point.lat, point.lon))
        .collect::<Vec<_>>()
        .join("|")
}

/// HTTP client for the routing service.
pub struct RoutingClient {
    client: Client,
    config: RoutingConfig,
}

impl RoutingClient {
    pub fn new(config: RoutingConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(RoutingError::Config("base URL is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_s.max(1)))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Drivable route through `waypoints` in order.
    pub async fn route(&self, waypoints: &[Coordinate]) -> Result<RouteResponse> {
        if waypoints.len() < 2 {
            return Err(RoutingError::TooFewWaypoints(waypoints.len()));
        }
        let body = self.fetch(waypoints).await?;
        let route = parse_route_response(&body)?;
        tracing::debug!(
            "Routing service returned {} vertices, {:.0} m over {} legs",
            route.polyline.len(),
            route.distance_m,
            route.legs.len()
        );
        Ok(route)
    }

    /// Nearest road position to `point`, found by routing from the point to
    /// itself and taking the first returned vertex.
    pub async fn snap_to_road(&self, point: &Coordinate) -> Result<Coordinate> {
        let body = self.fetch(&[*point, *point]).await?;
        let route = parse_route_response(&body)?;
        route
            .polyline
            .first()
            .copied()
            .ok_or(RoutingError::NoRoute)
    }

    async fn fetch(&self, waypoints: &[Coordinate]) -> Result<Value> {
        let waypoints = waypoints_param(waypoints);
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("waypoints", waypoints.as_str()),
                ("mode", self.config.mode.as_str()),
                ("apiKey", self.config.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Routing request failed: {} {}", status, body);
            return Err(RoutingError::Status { status, body });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| RoutingError::MalformedResponse(e.to_string()))
    }
}
