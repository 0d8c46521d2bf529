//! Scenario files.

use anyhow::{bail, Context, Result};
use roadmesh_core::{
    build_graph, classify, decode_segment_records, find_path, ClassifiedPoint, Coordinate,
    NetworkRules, NodeId, PathResult, PathSegment, PointOfInterest, Polyline, RouteGraph,
};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct ScenarioFile {
    #[serde(default)]
    main_route: Polyline,
    /// Stored segment records, in any shape the segment decoder accepts
    #[serde(default)]
    saved_segments: Value,
    #[serde(default)]
    points: Vec<PointOfInterest>,
}

/// The three network inputs.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub main_route: Polyline,
    pub saved_segments: Vec<PathSegment>,
    pub points: Vec<PointOfInterest>,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ScenarioFile = serde_json::from_str(json).context("Invalid scenario JSON")?;
        let saved_segments = decode_segment_records(&file.saved_segments.to_string())
            .context("Invalid saved_segments")?;
        Ok(Self {
            main_route: file.main_route,
            saved_segments,
            points: file.points,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&json)
    }

    pub fn classify(&self, rules: &NetworkRules) -> Vec<ClassifiedPoint> {
        classify(
            &self.points,
            &self.main_route,
            &self.saved_segments,
            rules.off_network_threshold_m,
        )
    }

    pub fn graph(&self, rules: &NetworkRules) -> RouteGraph {
        build_graph(
            &self.main_route,
            &self.saved_segments,
            &self.classify(rules),
            rules,
        )
    }

    /// Build the graph and search it. `Ok(None)` when the endpoints are
    /// not connected.
    pub fn find_path(
        &self,
        rules: &NetworkRules,
        from: &NodeId,
        to: &NodeId,
    ) -> Result<(RouteGraph, Option<PathResult>)> {
        let graph = self.graph(rules);
        let result = find_path(&graph, from, to)?;
        Ok((graph, result))
    }
}

/// A bare number is a point id; anything else is a node id.
pub fn parse_endpoint(value: &str) -> NodeId {
    match value.trim().parse::<u64>() {
        Ok(point_id) => NodeId::for_point(point_id),
        Err(_) => NodeId::new(value.trim()),
    }
}

/// `lat,lon|lat,lon|...`
pub fn parse_waypoints(value: &str) -> Result<Vec<Coordinate>> {
    value
        .split('|')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            let Some((lat, lon)) = part.split_once(',') else {
                bail!("Waypoint '{}' is not lat,lon", part);
            };
            let coordinate = Coordinate::new(
                lat.trim().parse().context("Invalid latitude")?,
                lon.trim().parse().context("Invalid longitude")?,
            );
            if !coordinate.is_valid() {
                bail!("Waypoint '{}' is out of range", part);
            }
            Ok(coordinate)
        })
        .collect()
}
