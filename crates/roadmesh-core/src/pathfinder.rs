//! Shortest paths over a [`RouteGraph`].
//!
//! A* with a binary-heap open set and the great-circle distance to the goal
//! as heuristic. Every edge weight is at least the great-circle distance
//! between its endpoints, so the heuristic never overestimates.

use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::error::{Result, RoadmeshError};
use crate::graph::{EdgeId, GraphEdge, NodeId, RouteGraph};
use crate::spatial::distance_m;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathResult {
    /// Node ids from start to goal, inclusive
    pub path: Vec<NodeId>,
    /// Sum of traversed edge weights (meters)
    pub distance: f64,
    /// Traversed edges, oriented in travel direction
    pub edges: Vec<GraphEdge>,
    pub nodes_visited: usize,
}

impl PathResult {
    /// Point-of-interest ids along the path, in travel order.
    pub fn point_ids(&self, graph: &RouteGraph) -> Vec<u64> {
        self.path
            .iter()
            .filter_map(|id| graph.node(id)?.point_index)
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OpenNode {
    f_score: FloatOrd,
    g_score: FloatOrd,
    node: NodeId,
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f_score
            .cmp(&other.f_score)
            .then_with(|| self.g_score.cmp(&other.g_score))
            .then_with(|| self.node.cmp(&other.node))
    }
}

/// Shortest path between two nodes.
///
/// Returns `Err(UnknownNode)` if either id is missing from the graph and
/// `Ok(None)` if the nodes are not connected.
pub fn find_path(graph: &RouteGraph, from: &NodeId, to: &NodeId) -> Result<Option<PathResult>> {
    let start = graph
        .node(from)
        .ok_or_else(|| RoadmeshError::UnknownNode(from.to_string()))?;
    let goal = graph
        .node(to)
        .ok_or_else(|| RoadmeshError::UnknownNode(to.to_string()))?;
    let goal_position = goal.position;
    let heuristic = |id: &NodeId| {
        graph
            .node(id)
            .map_or(0.0, |node| distance_m(&node.position, &goal_position))
    };

    let mut open_set: BinaryHeap<Reverse<OpenNode>> = BinaryHeap::new();
    open_set.push(Reverse(OpenNode {
        f_score: FloatOrd(distance_m(&start.position, &goal_position)),
        g_score: FloatOrd(0.0),
        node: from.clone(),
    }));
    let mut closed_set: HashSet<NodeId> = HashSet::new();
    let mut g_score: HashMap<NodeId, f64> = HashMap::new();
    let mut came_from: HashMap<NodeId, (NodeId, EdgeId)> = HashMap::new();
    g_score.insert(from.clone(), 0.0);

    let mut nodes_visited = 0usize;

    while let Some(Reverse(current)) = open_set.pop() {
        if closed_set.contains(&current.node) {
            continue;
        }
        let best_g = g_score.get(&current.node).copied().unwrap_or(f64::INFINITY);
        if current.g_score.0 > best_g + 1e-9 {
            continue;
        }

        nodes_visited += 1;

        if &current.node == to {
            let result = reconstruct(graph, &came_from, from, to, nodes_visited);
            tracing::debug!(
                "Path {} -> {}: {:.1} m over {} edges, {} nodes visited",
                from,
                to,
                result.distance,
                result.edges.len(),
                nodes_visited
            );
            return Ok(Some(result));
        }

        closed_set.insert(current.node.clone());

        for (edge, next) in graph.neighbors(&current.node) {
            if closed_set.contains(next) || !edge.weight.is_finite() || edge.weight < 0.0 {
                continue;
            }
            let tentative_g = best_g + edge.weight;
            if tentative_g < g_score.get(next).copied().unwrap_or(f64::INFINITY) {
                came_from.insert(next.clone(), (current.node.clone(), edge.id.clone()));
                g_score.insert(next.clone(), tentative_g);
                open_set.push(Reverse(OpenNode {
                    f_score: FloatOrd(tentative_g + heuristic(next)),
                    g_score: FloatOrd(tentative_g),
                    node: next.clone(),
                }));
            }
        }
    }

    tracing::debug!(
        "No path {} -> {} ({} nodes visited)",
        from,
        to,
        nodes_visited
    );
    Ok(None)
}

fn reconstruct(
    graph: &RouteGraph,
    came_from: &HashMap<NodeId, (NodeId, EdgeId)>,
    from: &NodeId,
    to: &NodeId,
    nodes_visited: usize,
) -> PathResult {
    let mut path = vec![to.clone()];
    let mut edges = Vec::new();
    let mut current = to;
    while current != from {
        let Some((previous, edge_id)) = came_from.get(current) else {
            break;
        };
        if let Some(edge) = graph.edge(edge_id) {
            edges.push(edge.oriented_from(previous));
        }
        path.push(previous.clone());
        current = previous;
    }
    path.reverse();
    edges.reverse();

    let distance = edges.iter().map(|edge| edge.weight).sum();
    PathResult {
        path,
        distance,
        edges,
        nodes_visited,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;
    use crate::graph::{build_graph, EdgeKind};
    use crate::models::{Coordinate, PathSegment, PointOfInterest, Polyline, SegmentTag};
    use crate::rules::NetworkRules;

    fn line(points: &[(f64, f64)]) -> Polyline {
        Polyline::new(points.iter().map(|&(lat, lon)| Coordinate::new(lat, lon)).collect())
    }

    fn graph_with_points(
        route: &Polyline,
        segments: &[PathSegment],
        points: &[PointOfInterest],
    ) -> RouteGraph {
        let rules = NetworkRules::new(20.0);
        let classified = classify(points, route, segments, rules.off_network_threshold_m);
        build_graph(route, segments, &classified, &rules)
    }

    #[test]
    fn unknown_node_is_an_error() {
        let graph = graph_with_points(&line(&[(0.0, 0.0), (0.0, 0.001)]), &[], &[]);
        let err = find_path(&graph, &NodeId::new("route:0"), &NodeId::new("nope")).unwrap_err();
        assert!(matches!(err, RoadmeshError::UnknownNode(id) if id == "nope"));
    }

    #[test]
    fn start_equals_goal_is_trivial() {
        let graph = graph_with_points(&line(&[(0.0, 0.0), (0.0, 0.001)]), &[], &[]);
        let id = NodeId::new("route:1");
        let result = find_path(&graph, &id, &id).unwrap().unwrap();
        assert_eq!(result.path, vec![id]);
        assert_eq!(result.distance, 0.0);
        assert!(result.edges.is_empty());
    }

    #[test]
    fn walks_the_main_route() {
        let route = line(&[(0.0, 0.0), (0.0, 0.001), (0.0, 0.002), (0.0, 0.003)]);
        let graph = graph_with_points(&route, &[], &[]);
        let result = find_path(&graph, &NodeId::new("route:3"), &NodeId::new("route:0"))
            .unwrap()
            .unwrap();
        assert_eq!(result.path.len(), 4);
        assert!((result.distance - route.length_m()).abs() < 1e-6);
        // Edges read in travel direction.
        assert_eq!(result.edges[0].from, NodeId::new("route:3"));
        assert_eq!(result.edges[0].positions.first(), Some(&Coordinate::new(0.0, 0.003)));
    }

    #[test]
    fn disconnected_components_have_no_path() {
        let far = PathSegment::new(
            "island",
            line(&[(10.0, 10.0), (10.0, 10.001)]),
            SegmentTag::OffNetwork,
        );
        let graph = graph_with_points(&line(&[(0.0, 0.0), (0.0, 0.001)]), &[far], &[]);
        let result = find_path(&graph, &NodeId::new("route:0"), &NodeId::new("seg0:0")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn point_to_point_uses_attachments() {
        let route = line(&[(0.0, 0.0), (0.0, 0.002)]);
        let points = vec![
            PointOfInterest::new(1, Coordinate::new(0.0002, 0.0005)),
            PointOfInterest::new(2, Coordinate::new(-0.0002, 0.0015)),
        ];
        let graph = graph_with_points(&route, &[], &points);
        let from = graph.point_node_id(1).unwrap();
        let to = graph.point_node_id(2).unwrap();
        let result = find_path(&graph, &from, &to).unwrap().unwrap();

        assert_eq!(result.point_ids(&graph), vec![1, 2]);
        assert_eq!(result.edges.first().map(|e| e.kind), Some(EdgeKind::Virtual));
        assert_eq!(result.edges.last().map(|e| e.kind), Some(EdgeKind::Virtual));
        // Never shorter than the straight line between the two points.
        let straight = distance_m(&points[0].position, &points[1].position);
        assert!(result.distance >= straight);
        let summed: f64 = result.edges.iter().map(|e| e.weight).sum();
        assert!((summed - result.distance).abs() < 1e-9);
    }

    #[test]
    fn path_is_deterministic() {
        let route = line(&[(0.0, 0.0), (0.0, 0.001), (0.0, 0.002)]);
        let points = vec![
            PointOfInterest::new(1, Coordinate::new(0.0003, 0.0)),
            PointOfInterest::new(2, Coordinate::new(0.0003, 0.002)),
        ];
        let graph = graph_with_points(&route, &[], &points);
        let run = || {
            find_path(&graph, &NodeId::for_point(1), &NodeId::for_point(2))
                .unwrap()
                .unwrap()
        };
        assert_eq!(run(), run());
    }
}
