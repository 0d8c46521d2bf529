//! Human-readable path reports and distance tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::graph::{EdgeKind, GraphNode, NodeId, RouteGraph};
use crate::models::{Coordinate, PointOfInterest};
use crate::pathfinder::PathResult;
use crate::spatial::{bearing_deg, compass_direction, distance_m, CompassDirection};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathEndpoint {
    pub node_id: NodeId,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point_id: Option<u64>,
    pub position: Coordinate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentDetail {
    /// 1-based position along the path
    pub index: usize,
    pub edge_id: String,
    pub kind: EdgeKind,
    pub from: Coordinate,
    pub to: Coordinate,
    pub distance_m: f64,
    pub distance_text: String,
    pub bearing_deg: f64,
    pub direction: CompassDirection,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathDetails {
    pub from: PathEndpoint,
    pub to: PathEndpoint,
    pub total_distance_m: f64,
    pub total_distance_text: String,
    pub segment_count: usize,
    pub nodes_visited: usize,
    pub segments: Vec<SegmentDetail>,
    pub generated_at: DateTime<Utc>,
}

/// "55.60 m" below a kilometer, "1.23 km" from there on.
pub fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.2} km", meters / 1000.0)
    } else {
        format!("{meters:.2} m")
    }
}

/// Structured report of a found path, one entry per traversed edge.
///
/// Returns `None` only for an empty path, which `find_path` never produces.
pub fn export_path_details(graph: &RouteGraph, result: &PathResult) -> Option<PathDetails> {
    let from = endpoint(graph, result.path.first()?);
    let to = endpoint(graph, result.path.last()?);

    let segments: Vec<SegmentDetail> = result
        .edges
        .iter()
        .enumerate()
        .filter_map(|(i, edge)| {
            let start = *edge.positions.first()?;
            let end = *edge.positions.last()?;
            let bearing = bearing_deg(&start, &end);
            let direction = compass_direction(bearing);
            let distance_text = format_distance(edge.weight);
            let description = describe(edge.kind, direction, &distance_text);
            Some(SegmentDetail {
                index: i + 1,
                edge_id: edge.id.to_string(),
                kind: edge.kind,
                from: start,
                to: end,
                distance_m: edge.weight,
                distance_text,
                bearing_deg: bearing,
                direction,
                description,
            })
        })
        .collect();

    Some(PathDetails {
        from,
        to,
        total_distance_m: result.distance,
        total_distance_text: format_distance(result.distance),
        segment_count: segments.len(),
        nodes_visited: result.nodes_visited,
        segments,
        generated_at: Utc::now(),
    })
}

fn endpoint(graph: &RouteGraph, id: &NodeId) -> PathEndpoint {
    let node: Option<&GraphNode> = graph.node(id);
    PathEndpoint {
        node_id: id.clone(),
        label: node
            .and_then(|n| n.label.clone())
            .unwrap_or_else(|| id.to_string()),
        point_id: node.and_then(|n| n.point_index),
        position: node.map_or(Coordinate::new(0.0, 0.0), |n| n.position),
    }
}

fn describe(kind: EdgeKind, direction: CompassDirection, distance_text: &str) -> String {
    let surface = match kind {
        EdgeKind::Road => "along the road",
        EdgeKind::OffRoad => "off-road",
        EdgeKind::Virtual => "cross-country connector",
    };
    format!(
        "Head {} ({}) for {} {}",
        direction.label(),
        direction.name(),
        distance_text,
        surface
    )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairDistance {
    pub from: u64,
    pub to: u64,
    pub distance_m: f64,
}

/// Straight-line distance between every pair of points, rounded to the
/// centimeter.
pub fn pairwise_distances(points: &[PointOfInterest]) -> Vec<PairDistance> {
    let mut table = Vec::with_capacity(points.len() * points.len().saturating_sub(1) / 2);
    for (i, a) in points.iter().enumerate() {
        for b in &points[i + 1..] {
            let distance = distance_m(&a.position, &b.position);
            table.push(PairDistance {
                from: a.id,
                to: b.id,
                distance_m: (distance * 100.0).round() / 100.0,
            });
        }
    }
    table
}
