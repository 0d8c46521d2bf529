//! Point of interest endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use roadmesh_core::{ClassifiedPoint, Coordinate, PointKind, PointOfInterest};
use serde::Deserialize;
use std::sync::Arc;

use crate::state::{AddPointOutcome, AppState};

#[derive(Debug, Deserialize)]
pub struct CreatePointRequest {
    pub lat: f64,
    #[serde(alias = "lng")]
    pub lon: f64,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub kind: PointKind,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

/// Add a point. Positions already taken by another point are rejected.
pub async fn create_point(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePointRequest>,
) -> Result<(StatusCode, Json<PointOfInterest>), (StatusCode, String)> {
    let mut point = PointOfInterest::new(0, Coordinate::new(req.lat, req.lon)).with_kind(req.kind);
    point.label = req.label.filter(|label| !label.trim().is_empty());
    point.payload = req.payload;

    match state.add_point(point) {
        AddPointOutcome::Added(point) => {
            tracing::info!("Added point {} at ({}, {})", point.id, req.lat, req.lon);
            Ok((StatusCode::CREATED, Json(point)))
        }
        AddPointOutcome::Invalid => Err((
            StatusCode::BAD_REQUEST,
            format!("Invalid position ({}, {})", req.lat, req.lon),
        )),
        AddPointOutcome::Duplicate(existing) => Err((
            StatusCode::CONFLICT,
            format!("Point {} already exists at this position", existing),
        )),
    }
}

pub async fn list_points(State(state): State<Arc<AppState>>) -> Json<Vec<PointOfInterest>> {
    Json(state.get_points())
}

pub async fn get_point(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<PointOfInterest>, StatusCode> {
    state.get_point(id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

pub async fn delete_point(State(state): State<Arc<AppState>>, Path(id): Path<u64>) -> StatusCode {
    if state.remove_point(id) {
        tracing::info!("Deleted point {}", id);
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub async fn clear_points(State(state): State<Arc<AppState>>) -> StatusCode {
    let removed = state.clear_points();
    tracing::info!("Cleared {} points", removed);
    StatusCode::NO_CONTENT
}

/// Every point with its distance to the network and attachment.
pub async fn classified_points(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<ClassifiedPoint>> {
    Json(state.classified_points().await)
}
