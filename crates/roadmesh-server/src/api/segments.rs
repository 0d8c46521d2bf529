//! Saved path segment endpoints.

use axum::{extract::State, http::StatusCode, Json};
use roadmesh_core::{preview_custom_road, CustomRoadPreview, PathSegment, Polyline};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::state::AppState;

pub async fn list_segments(State(state): State<Arc<AppState>>) -> Json<Vec<PathSegment>> {
    Json(state.segments().await)
}

#[derive(Debug, Deserialize)]
pub struct CustomRoadRequest {
    pub label: String,
    pub polyline: Polyline,
    /// Report attachments without saving
    #[serde(default)]
    pub preview_only: bool,
}

#[derive(Debug, Serialize)]
pub struct CustomRoadResponse {
    pub preview: CustomRoadPreview,
    pub saved: bool,
}

/// Author a custom road. Always reports where its endpoints would be
/// stitched; saves it unless `preview_only` is set.
pub async fn create_custom_road(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CustomRoadRequest>,
) -> Result<(StatusCode, Json<CustomRoadResponse>), (StatusCode, String)> {
    let label = req.label.trim();
    if label.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Label is required".to_string()));
    }

    let (route, segments, _) = state.network_inputs().await;
    let preview = preview_custom_road(&req.polyline, label, &route, &segments, state.rules())
        .ok_or((
            StatusCode::BAD_REQUEST,
            "Custom road needs at least two valid vertices".to_string(),
        ))?;

    if req.preview_only {
        return Ok((
            StatusCode::OK,
            Json(CustomRoadResponse {
                preview,
                saved: false,
            }),
        ));
    }

    let added = state
        .add_segments(vec![preview.segment.clone()])
        .await
        .map_err(|e| {
            tracing::error!("Failed to persist custom road: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;
    tracing::info!(
        "Custom road '{}' {} ({} start / {} end attachments)",
        preview.segment.label,
        if added > 0 { "saved" } else { "already saved" },
        preview.start_candidates.len(),
        preview.end_candidates.len()
    );
    let status = if added > 0 {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(CustomRoadResponse {
            preview,
            saved: added > 0,
        }),
    ))
}

/// Delete every saved segment.
pub async fn clear_segments(State(state): State<Arc<AppState>>) -> StatusCode {
    match state.clear_segments().await {
        Ok(count) => {
            tracing::info!("Cleared {} saved segments", count);
            StatusCode::NO_CONTENT
        }
        Err(e) => {
            tracing::error!("Failed to clear saved segments: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
