//! Path queries over the current network.

use axum::{extract::State, http::StatusCode, Json};
use roadmesh_core::{
    export_path_details, find_path, segments_from_path, NodeId, PathDetails, PathResult,
    RoadmeshError, SaveGranularity,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::state::AppState;

/// A path endpoint: a point of interest or any graph node.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Endpoint {
    Point { point_id: u64 },
    Node { node_id: NodeId },
}

impl Endpoint {
    fn node_id(&self) -> NodeId {
        match self {
            Endpoint::Point { point_id } => NodeId::for_point(*point_id),
            Endpoint::Node { node_id } => node_id.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PathRequest {
    pub from: Endpoint,
    pub to: Endpoint,
    /// Save the found path as segments
    #[serde(default)]
    pub save: bool,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub granularity: SaveGranularity,
}

#[derive(Debug, Serialize)]
pub struct SavedPath {
    pub segments_added: usize,
    pub saved_length_m: f64,
    pub skipped_length_m: f64,
    pub total_length_m: f64,
}

#[derive(Debug, Serialize)]
pub struct PathResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<PathResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<PathDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved: Option<SavedPath>,
}

/// Find the shortest path between two endpoints, optionally saving it.
///
/// No path is a normal answer (`found: false`); an endpoint missing from
/// the graph is a 404.
pub async fn find_path_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PathRequest>,
) -> Result<Json<PathResponse>, (StatusCode, String)> {
    let graph = state.route_graph().await;
    let from = req.from.node_id();
    let to = req.to.node_id();

    let result = match find_path(&graph, &from, &to) {
        Ok(result) => result,
        Err(RoadmeshError::UnknownNode(id)) => {
            return Err((StatusCode::NOT_FOUND, format!("Unknown node {}", id)))
        }
        Err(e) => return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    };

    let Some(result) = result else {
        tracing::info!("No path between {} and {}", from, to);
        return Ok(Json(PathResponse {
            found: false,
            result: None,
            details: None,
            saved: None,
        }));
    };

    let details = export_path_details(&graph, &result);
    let saved = if req.save {
        let label = req
            .label
            .filter(|label| !label.trim().is_empty())
            .unwrap_or_else(|| format!("{} to {}", from, to));
        let summary = segments_from_path(&result, &label, req.granularity);
        let added = state
            .add_segments(summary.segments)
            .await
            .map_err(|e| {
                tracing::error!("Failed to persist path segments: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            })?;
        Some(SavedPath {
            segments_added: added,
            saved_length_m: summary.saved_length_m,
            skipped_length_m: summary.skipped_length_m,
            total_length_m: summary.total_length_m,
        })
    } else {
        None
    };

    tracing::info!(
        "Path {} -> {}: {:.1} m, {} edges",
        from,
        to,
        result.distance,
        result.edges.len()
    );
    Ok(Json(PathResponse {
        found: true,
        result: Some(result),
        details,
        saved,
    }))
}
