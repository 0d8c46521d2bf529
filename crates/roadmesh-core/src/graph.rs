//! Route network graph.
//!
//! The graph is an arena of nodes and edges keyed by id, rebuilt wholesale
//! from the main route, the saved segments and the classified points every
//! time any of them changes. Nothing in it holds live references.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::models::{
    ClassifiedPoint, Coordinate, NetworkSource, PathSegment, PointKind, Polyline,
};
use crate::rules::NetworkRules;
use crate::spatial::distance_m;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Id of the node that stands for a point of interest.
    pub fn for_point(point_id: u64) -> Self {
        Self(format!("poi:{point_id}"))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(String);

impl EdgeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Road,
    Checkpoint,
    House,
    Virtual,
}

impl From<PointKind> for NodeKind {
    fn from(kind: PointKind) -> Self {
        match kind {
            PointKind::Checkpoint => NodeKind::Checkpoint,
            PointKind::House => NodeKind::House,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    Road,
    OffRoad,
    Virtual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub position: Coordinate,
    /// Back-reference to the point of interest this node stands for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point_index: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub kind: NodeKind,
}

/// Undirected weighted edge. `from`/`to` are storage order only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    /// Geodesic length in meters
    pub weight: f64,
    pub positions: Polyline,
    pub kind: EdgeKind,
}

impl GraphEdge {
    /// The endpoint opposite `node`, if `node` is an endpoint at all.
    pub fn other_end(&self, node: &NodeId) -> Option<&NodeId> {
        if &self.from == node {
            Some(&self.to)
        } else if &self.to == node {
            Some(&self.from)
        } else {
            None
        }
    }

    /// Copy of this edge read in the direction leaving `from`.
    pub fn oriented_from(&self, from: &NodeId) -> GraphEdge {
        if &self.from == from {
            return self.clone();
        }
        let mut points = self.positions.points().to_vec();
        points.reverse();
        GraphEdge {
            id: self.id.clone(),
            from: self.to.clone(),
            to: self.from.clone(),
            weight: self.weight,
            positions: Polyline::new(points),
            kind: self.kind,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteGraph {
    nodes: BTreeMap<NodeId, GraphNode>,
    edges: BTreeMap<EdgeId, GraphEdge>,
    adjacency: BTreeMap<NodeId, Vec<EdgeId>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub node_count: usize,
    pub edge_count: usize,
    pub total_weight_m: f64,
    pub road_edges: usize,
    pub off_road_edges: usize,
    pub virtual_edges: usize,
    pub isolated_nodes: usize,
}

impl RouteGraph {
    pub fn node(&self, id: &NodeId) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&GraphEdge> {
        self.edges.get(id)
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.edges.values()
    }

    /// Edges incident to `id`, paired with the node at their far end.
    pub fn neighbors<'a>(
        &'a self,
        id: &'a NodeId,
    ) -> impl Iterator<Item = (&'a GraphEdge, &'a NodeId)> + 'a {
        self.adjacency
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(move |edge_id| {
                let edge = self.edges.get(edge_id)?;
                Some((edge, edge.other_end(id)?))
            })
    }

    pub fn degree(&self, id: &NodeId) -> usize {
        self.adjacency.get(id).map_or(0, Vec::len)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn total_weight(&self) -> f64 {
        self.edges.values().map(|edge| edge.weight).sum()
    }

    /// Node id for a point of interest, if the point made it into the graph.
    pub fn point_node_id(&self, point_id: u64) -> Option<NodeId> {
        let id = NodeId::for_point(point_id);
        self.nodes.contains_key(&id).then_some(id)
    }

    pub fn summary(&self) -> GraphSummary {
        let count_kind = |kind: EdgeKind| self.edges.values().filter(|e| e.kind == kind).count();
        GraphSummary {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            total_weight_m: self.total_weight(),
            road_edges: count_kind(EdgeKind::Road),
            off_road_edges: count_kind(EdgeKind::OffRoad),
            virtual_edges: count_kind(EdgeKind::Virtual),
            isolated_nodes: self.nodes.keys().filter(|id| self.degree(id) == 0).count(),
        }
    }

    fn insert_node(&mut self, node: GraphNode) {
        self.adjacency.entry(node.id.clone()).or_default();
        self.nodes.insert(node.id.clone(), node);
    }

    fn insert_edge(&mut self, edge: GraphEdge) {
        self.adjacency
            .entry(edge.from.clone())
            .or_default()
            .push(edge.id.clone());
        self.adjacency
            .entry(edge.to.clone())
            .or_default()
            .push(edge.id.clone());
        self.edges.insert(edge.id.clone(), edge);
    }
}

/// Which polyline a road node came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RoadGroup {
    MainRoute,
    Segment(usize),
}

#[derive(Debug, Clone)]
struct RoadNode {
    id: NodeId,
    position: Coordinate,
    group: RoadGroup,
}

#[derive(Debug, Clone)]
struct PolylineNodes {
    ids: Vec<NodeId>,
    edge_kind: EdgeKind,
}

/// A road node a position would be stitched to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StitchCandidate {
    pub node_id: NodeId,
    pub position: Coordinate,
    pub distance_m: f64,
    pub on_main_route: bool,
}

/// Incremental construction of a [`RouteGraph`].
///
/// Steps run in a fixed order (main route, saved segments, endpoint
/// stitching, point attachment) so ids come out the same for the same input.
pub struct GraphBuilder<'a> {
    rules: &'a NetworkRules,
    graph: RouteGraph,
    road_nodes: Vec<RoadNode>,
    main_route: Option<PolylineNodes>,
    segments: Vec<Option<PolylineNodes>>,
    linked: HashSet<(NodeId, NodeId)>,
    stitch_count: usize,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(rules: &'a NetworkRules) -> Self {
        Self {
            rules,
            graph: RouteGraph::default(),
            road_nodes: Vec::new(),
            main_route: None,
            segments: Vec::new(),
            linked: HashSet::new(),
            stitch_count: 0,
        }
    }

    /// Road nodes and edges for the main route (step 1).
    pub fn add_main_route(&mut self, main_route: &Polyline) -> &mut Self {
        let line = main_route.cleaned();
        self.main_route =
            self.add_polyline("route", &line, RoadGroup::MainRoute, EdgeKind::Road);
        self
    }

    /// Road or off-road nodes and edges per saved segment, each in its own
    /// namespace (step 2).
    pub fn add_saved_segments(&mut self, segments: &[PathSegment]) -> &mut Self {
        for (index, segment) in segments.iter().enumerate() {
            let line = segment.polyline.cleaned();
            let edge_kind = if segment.tag.is_off_network() {
                EdgeKind::OffRoad
            } else {
                EdgeKind::Road
            };
            let nodes = self.add_polyline(
                &format!("seg{index}"),
                &line,
                RoadGroup::Segment(index),
                edge_kind,
            );
            if nodes.is_none() {
                tracing::warn!(
                    "Skipping saved segment '{}': fewer than two usable vertices",
                    segment.label
                );
            }
            self.segments.push(nodes);
        }
        self
    }

    /// Connect both endpoints of every saved segment to nearby road nodes
    /// of other polylines (step 3).
    pub fn stitch_segment_endpoints(&mut self) -> &mut Self {
        let endpoints: Vec<(usize, NodeId)> = self
            .segments
            .iter()
            .enumerate()
            .filter_map(|(index, nodes)| nodes.as_ref().map(|nodes| (index, nodes)))
            .flat_map(|(index, nodes)| {
                let first = nodes.ids.first().cloned();
                let last = nodes.ids.last().cloned();
                [first, last].into_iter().flatten().map(move |id| (index, id))
            })
            .collect();

        for (index, endpoint) in endpoints {
            let Some(position) = self.graph.node(&endpoint).map(|node| node.position) else {
                continue;
            };
            let candidates = self.select_candidates(&position, Some(RoadGroup::Segment(index)));
            for candidate in candidates {
                self.add_stitch_edge(&endpoint, &position, &candidate);
            }
        }
        self
    }

    /// Point nodes, their attachment nodes and the links into the network
    /// (step 4).
    pub fn attach_points(&mut self, classified: &[ClassifiedPoint]) -> &mut Self {
        for entry in classified {
            let point = &entry.point;
            if !point.position.is_valid() {
                tracing::warn!("Skipping point {} with invalid position", point.id);
                continue;
            }
            let point_node = NodeId::for_point(point.id);
            if self.graph.contains_node(&point_node) {
                tracing::warn!("Skipping duplicate point id {}", point.id);
                continue;
            }
            self.graph.insert_node(GraphNode {
                id: point_node.clone(),
                position: point.position,
                point_index: Some(point.id),
                label: Some(point.display_name()),
                kind: point.kind.into(),
            });

            // Empty network: the point stays isolated.
            let Some(nearest) = entry.nearest_network_point.filter(|p| p.is_valid()) else {
                continue;
            };

            let attach_node = NodeId::new(format!("attach:{}", point.id));
            self.graph.insert_node(GraphNode {
                id: attach_node.clone(),
                position: nearest,
                point_index: None,
                label: None,
                kind: NodeKind::Virtual,
            });
            let weight = if entry.distance_to_network_m.is_finite() {
                entry.distance_to_network_m
            } else {
                distance_m(&point.position, &nearest)
            };
            self.add_edge(GraphEdge {
                id: EdgeId::new(format!("attach:{}", point.id)),
                from: point_node,
                to: attach_node.clone(),
                weight,
                positions: Polyline::new(vec![point.position, nearest]),
                kind: EdgeKind::Virtual,
            });

            if let Some(source) = entry.source {
                self.splice_into_edge(point.id, &attach_node, &nearest, source);
            }
            let candidates = self.select_candidates(&nearest, None);
            for candidate in candidates {
                self.add_stitch_edge(&attach_node, &nearest, &candidate);
            }
        }
        self
    }

    /// Where a position would be stitched, without adding anything.
    pub fn stitch_candidates(&self, position: &Coordinate) -> Vec<StitchCandidate> {
        self.select_candidates(position, None)
    }

    pub fn finish(self) -> RouteGraph {
        tracing::debug!(
            "Built route graph: {} nodes, {} edges, {} stitch edges",
            self.graph.node_count(),
            self.graph.edge_count(),
            self.stitch_count
        );
        self.graph
    }

    fn add_polyline(
        &mut self,
        prefix: &str,
        line: &Polyline,
        group: RoadGroup,
        edge_kind: EdgeKind,
    ) -> Option<PolylineNodes> {
        if line.len() < 2 {
            return None;
        }
        let ids: Vec<NodeId> = (0..line.len())
            .map(|i| NodeId::new(format!("{prefix}:{i}")))
            .collect();
        for (id, position) in ids.iter().zip(line.points()) {
            self.graph.insert_node(GraphNode {
                id: id.clone(),
                position: *position,
                point_index: None,
                label: None,
                kind: NodeKind::Road,
            });
            self.road_nodes.push(RoadNode {
                id: id.clone(),
                position: *position,
                group,
            });
        }
        for (i, pair) in line.points().windows(2).enumerate() {
            self.add_edge(GraphEdge {
                id: EdgeId::new(format!("{prefix}:{i}-{}", i + 1)),
                from: ids[i].clone(),
                to: ids[i + 1].clone(),
                weight: distance_m(&pair[0], &pair[1]),
                positions: Polyline::new(pair.to_vec()),
                kind: edge_kind,
            });
        }
        Some(PolylineNodes { ids, edge_kind })
    }

    /// Link an attachment node to both ends of the edge it was projected on.
    fn splice_into_edge(
        &mut self,
        point_id: u64,
        attach_node: &NodeId,
        position: &Coordinate,
        source: NetworkSource,
    ) {
        let nodes = match source {
            NetworkSource::MainRoute { .. } => self.main_route.as_ref(),
            NetworkSource::SavedSegment { segment_index, .. } => {
                self.segments.get(segment_index).and_then(Option::as_ref)
            }
        };
        let Some(nodes) = nodes else {
            return;
        };
        let edge_index = source.edge_index();
        let (Some(start), Some(end)) = (
            nodes.ids.get(edge_index).cloned(),
            nodes.ids.get(edge_index + 1).cloned(),
        ) else {
            return;
        };
        let edge_kind = nodes.edge_kind;

        for (suffix, vertex) in [("a", start), ("b", end)] {
            let Some(vertex_position) = self.graph.node(&vertex).map(|node| node.position) else {
                continue;
            };
            self.add_edge(GraphEdge {
                id: EdgeId::new(format!("splice:{point_id}:{suffix}")),
                from: attach_node.clone(),
                to: vertex,
                weight: distance_m(position, &vertex_position),
                positions: Polyline::new(vec![*position, vertex_position]),
                kind: edge_kind,
            });
        }
    }

    fn select_candidates(
        &self,
        position: &Coordinate,
        exclude: Option<RoadGroup>,
    ) -> Vec<StitchCandidate> {
        let mut coincident = Vec::new();
        let mut nearby = Vec::new();
        for road in &self.road_nodes {
            if Some(road.group) == exclude {
                continue;
            }
            let distance = distance_m(position, &road.position);
            if distance > self.rules.stitch_radius_m {
                continue;
            }
            let candidate = StitchCandidate {
                node_id: road.id.clone(),
                position: road.position,
                distance_m: distance,
                on_main_route: road.group == RoadGroup::MainRoute,
            };
            if distance <= self.rules.coincident_join_m {
                coincident.push(candidate);
            } else {
                nearby.push(candidate);
            }
        }

        let prefer_main = self.rules.prefer_main_route;
        nearby.sort_by(|a, b| {
            let main_first = if prefer_main {
                b.on_main_route.cmp(&a.on_main_route)
            } else {
                Ordering::Equal
            };
            main_first
                .then_with(|| a.distance_m.total_cmp(&b.distance_m))
                .then_with(|| a.node_id.cmp(&b.node_id))
        });
        nearby.truncate(self.rules.max_stitch_neighbors);

        coincident.sort_by(|a, b| {
            a.distance_m
                .total_cmp(&b.distance_m)
                .then_with(|| a.node_id.cmp(&b.node_id))
        });
        coincident.extend(nearby);
        coincident
    }

    fn add_stitch_edge(&mut self, from: &NodeId, position: &Coordinate, to: &StitchCandidate) {
        if from == &to.node_id {
            return;
        }
        let id = EdgeId::new(format!("stitch:{}", self.stitch_count));
        let added = self.add_edge(GraphEdge {
            id,
            from: from.clone(),
            to: to.node_id.clone(),
            weight: to.distance_m,
            positions: Polyline::new(vec![*position, to.position]),
            kind: EdgeKind::Virtual,
        });
        if added {
            self.stitch_count += 1;
        }
    }

    /// Insert unless the unordered node pair is already linked.
    fn add_edge(&mut self, edge: GraphEdge) -> bool {
        let key = if edge.from <= edge.to {
            (edge.from.clone(), edge.to.clone())
        } else {
            (edge.to.clone(), edge.from.clone())
        };
        if !self.linked.insert(key) {
            return false;
        }
        self.graph.insert_edge(edge);
        true
    }
}

/// Build the route network from its three inputs.
///
/// `classified` must come from [`crate::classifier::classify`] run against
/// the same `main_route` and `saved_segments`, so that attachment sources
/// point at the right polyline edges.
pub fn build_graph(
    main_route: &Polyline,
    saved_segments: &[PathSegment],
    classified: &[ClassifiedPoint],
    rules: &NetworkRules,
) -> RouteGraph {
    let mut builder = GraphBuilder::new(rules);
    builder
        .add_main_route(main_route)
        .add_saved_segments(saved_segments)
        .stitch_segment_endpoints()
        .attach_points(classified);
    builder.finish()
}
