//! REST API routes.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

use crate::api::{network, paths, points, route, segments};
use crate::state::AppState;

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/v1/points", get(points::list_points))
        .route("/v1/points", post(points::create_point))
        .route("/v1/points", delete(points::clear_points))
        .route("/v1/points/classified", get(points::classified_points))
        .route("/v1/points/:id", get(points::get_point))
        .route("/v1/points/:id", delete(points::delete_point))
        .route("/v1/route", get(route::get_route))
        .route("/v1/route", put(route::set_route))
        .route("/v1/route", delete(route::clear_route))
        .route("/v1/route/compute", post(route::compute_route))
        .route("/v1/route/snap", post(route::snap_point))
        .route("/v1/segments", get(segments::list_segments))
        .route("/v1/segments", delete(segments::clear_segments))
        .route("/v1/segments/custom", post(segments::create_custom_road))
        .route("/v1/paths", post(paths::find_path_handler))
        .route("/v1/distances", get(network::distances))
        .route("/v1/graph", get(network::graph))
        .route("/v1/graph/summary", get(network::graph_summary))
}
