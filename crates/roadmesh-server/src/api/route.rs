//! Main route endpoints.
//!
//! The main route comes from the routing service or is set directly. A
//! failed routing request leaves the server without a main route; the
//! network keeps working from saved segments alone.

use axum::{extract::State, http::StatusCode, Json};
use roadmesh_core::{distance_m, ClassifiedPoint, Coordinate, Polyline};
use roadmesh_routing::RouteResponse;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MainRouteResponse {
    pub polyline: Polyline,
    pub vertex_count: usize,
    pub length_m: f64,
}

impl From<Polyline> for MainRouteResponse {
    fn from(polyline: Polyline) -> Self {
        Self {
            vertex_count: polyline.len(),
            length_m: polyline.length_m(),
            polyline,
        }
    }
}

pub async fn get_route(State(state): State<Arc<AppState>>) -> Json<MainRouteResponse> {
    Json(state.main_route().into())
}

#[derive(Debug, Deserialize)]
pub struct SetRouteRequest {
    pub polyline: Polyline,
}

/// Set the main route directly.
pub async fn set_route(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SetRouteRequest>,
) -> Result<Json<MainRouteResponse>, (StatusCode, String)> {
    let polyline = req.polyline.cleaned();
    if polyline.len() < 2 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Main route needs at least two valid vertices".to_string(),
        ));
    }
    state.set_main_route(polyline.clone());
    tracing::info!("Main route set directly ({} vertices)", polyline.len());
    Ok(Json(polyline.into()))
}

pub async fn clear_route(State(state): State<Arc<AppState>>) -> StatusCode {
    state.clear_main_route();
    tracing::info!("Main route cleared");
    StatusCode::NO_CONTENT
}

#[derive(Debug, Default, Deserialize)]
pub struct ComputeRouteRequest {
    /// Defaults to every point in id order
    #[serde(default)]
    pub waypoints: Option<Vec<Coordinate>>,
}

#[derive(Debug, Serialize)]
pub struct ComputeRouteResponse {
    /// False when a newer request or a direct edit superseded this one
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<RouteResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Ask the routing service for a main route through the waypoints.
pub async fn compute_route(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ComputeRouteRequest>,
) -> Result<Json<ComputeRouteResponse>, (StatusCode, String)> {
    let waypoints = req.waypoints.unwrap_or_else(|| {
        state
            .get_points()
            .into_iter()
            .map(|point| point.position)
            .collect()
    });
    if waypoints.len() < 2 {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("At least two waypoints are required (got {})", waypoints.len()),
        ));
    }

    let generation = state.begin_route_request();
    let outcome = match state.routing() {
        Some(client) => client.route(&waypoints).await.map_err(|e| e.to_string()),
        None => Err("No routing service configured".to_string()),
    };

    let response = match outcome {
        Ok(route) => {
            let applied = state.finish_route_request(generation, Some(route.polyline.clone()));
            tracing::info!(
                "Main route {} ({} vertices, {:.0} m)",
                if applied { "updated" } else { "discarded" },
                route.polyline.len(),
                route.distance_m
            );
            ComputeRouteResponse {
                applied,
                route: Some(route),
                error: None,
            }
        }
        Err(error) => {
            tracing::warn!("Routing failed, continuing without a main route: {}", error);
            let applied = state.finish_route_request(generation, None);
            ComputeRouteResponse {
                applied,
                route: None,
                error: Some(error),
            }
        }
    };
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
pub struct SnapResponse {
    pub original: Coordinate,
    pub snapped: Coordinate,
    /// How far the routing service moved the point
    pub snap_distance_m: f64,
    /// The original point against the current network
    pub classification: ClassifiedPoint,
}

/// Snap a position to the nearest road via the routing service.
pub async fn snap_point(
    State(state): State<Arc<AppState>>,
    Json(point): Json<Coordinate>,
) -> Result<Json<SnapResponse>, (StatusCode, String)> {
    let classification = state
        .classify_position(point)
        .await
        .ok_or((StatusCode::BAD_REQUEST, "Invalid position".to_string()))?;
    let client = state.routing().ok_or((
        StatusCode::SERVICE_UNAVAILABLE,
        "No routing service configured".to_string(),
    ))?;
    let snapped = client.snap_to_road(&point).await.map_err(|e| {
        tracing::warn!("Snap to road failed: {}", e);
        (StatusCode::BAD_GATEWAY, e.to_string())
    })?;
    Ok(Json(SnapResponse {
        original: point,
        snapped,
        snap_distance_m: distance_m(&point, &snapped),
        classification,
    }))
}
