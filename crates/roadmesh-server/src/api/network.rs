//! Read-only views of the derived network.

use axum::{extract::State, Json};
use roadmesh_core::{pairwise_distances, GraphSummary, PairDistance, RouteGraph};
use std::sync::Arc;

use crate::state::AppState;

/// Straight-line distance between every pair of points.
pub async fn distances(State(state): State<Arc<AppState>>) -> Json<Vec<PairDistance>> {
    Json(pairwise_distances(&state.get_points()))
}

pub async fn graph_summary(State(state): State<Arc<AppState>>) -> Json<GraphSummary> {
    Json(state.route_graph().await.summary())
}

/// Full node and edge lists, for rendering.
pub async fn graph(State(state): State<Arc<AppState>>) -> Json<RouteGraph> {
    Json(state.route_graph().await)
}
