//! Core data models for the route network.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::spatial::{distance_m, polyline_length_m};

/// Tolerance used wherever coordinate identity matters (~0.11 m per axis).
pub const COORDINATE_EPSILON_DEG: f64 = 1e-6;

/// A WGS84 latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    #[serde(alias = "lng")]
    pub lon: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    /// Latitude in [-90, 90], longitude in [-180, 180], both finite.
    pub fn is_valid(&self) -> bool {
        self.is_finite() && self.lat.abs() <= 90.0 && self.lon.abs() <= 180.0
    }

    pub fn approx_eq(&self, other: &Coordinate) -> bool {
        (self.lat - other.lat).abs() <= COORDINATE_EPSILON_DEG
            && (self.lon - other.lon).abs() <= COORDINATE_EPSILON_DEG
    }
}

/// Ordered sequence of coordinates. Needs at least two vertices to be
/// projected onto or turned into edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polyline {
    points: Vec<Coordinate>,
}

impl Polyline {
    pub fn new(points: Vec<Coordinate>) -> Self {
        Self { points }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&Coordinate> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&Coordinate> {
        self.points.last()
    }

    pub fn length_m(&self) -> f64 {
        polyline_length_m(&self.points)
    }

    /// Drops invalid vertices and consecutive duplicates.
    pub fn cleaned(&self) -> Polyline {
        let mut points: Vec<Coordinate> = Vec::with_capacity(self.points.len());
        for point in self.points.iter().filter(|p| p.is_valid()) {
            if points.last().is_some_and(|last| last.approx_eq(point)) {
                continue;
            }
            points.push(*point);
        }
        Polyline { points }
    }

    pub fn into_points(self) -> Vec<Coordinate> {
        self.points
    }
}

impl From<Vec<Coordinate>> for Polyline {
    fn from(points: Vec<Coordinate>) -> Self {
        Self::new(points)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointKind {
    #[default]
    Checkpoint,
    House,
}

/// An operator-marked location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub id: u64,
    #[serde(default)]
    pub label: Option<String>,
    pub position: Coordinate,
    #[serde(default)]
    pub kind: PointKind,
    /// Caller metadata, carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl PointOfInterest {
    pub fn new(id: u64, position: Coordinate) -> Self {
        Self {
            id,
            label: None,
            position,
            kind: PointKind::Checkpoint,
            payload: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_kind(mut self, kind: PointKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn display_name(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("Point {}", self.id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentTag {
    OnNetwork,
    OffNetwork,
    Custom,
}

impl SegmentTag {
    pub fn is_off_network(self) -> bool {
        matches!(self, SegmentTag::OffNetwork)
    }
}

/// A persisted path fragment. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSegment {
    pub label: String,
    pub polyline: Polyline,
    pub tag: SegmentTag,
    pub length_m: f64,
    pub created_at: DateTime<Utc>,
}

impl PathSegment {
    pub fn new(label: impl Into<String>, polyline: Polyline, tag: SegmentTag) -> Self {
        let length_m = polyline.length_m();
        Self {
            label: label.into(),
            polyline,
            tag,
            length_m,
            created_at: Utc::now(),
        }
    }

    /// Same vertex sequence within coordinate tolerance.
    pub fn same_geometry(&self, other: &PathSegment) -> bool {
        let a = self.polyline.points();
        let b = other.polyline.points();
        a.len() == b.len() && a.iter().zip(b).all(|(p, q)| p.approx_eq(q))
    }
}

/// Which kind of path source a point was classified against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    MainRoute,
    SavedSegment,
    None,
}

/// Exact polyline edge a projection landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum NetworkSource {
    MainRoute { edge_index: usize },
    SavedSegment { segment_index: usize, edge_index: usize },
}

impl NetworkSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            NetworkSource::MainRoute { .. } => SourceKind::MainRoute,
            NetworkSource::SavedSegment { .. } => SourceKind::SavedSegment,
        }
    }

    pub fn edge_index(&self) -> usize {
        match self {
            NetworkSource::MainRoute { edge_index }
            | NetworkSource::SavedSegment { edge_index, .. } => *edge_index,
        }
    }
}

/// A point of interest with its relation to the current network.
/// Derived on every input change; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedPoint {
    pub point: PointOfInterest,
    pub distance_to_network_m: f64,
    pub nearest_network_point: Option<Coordinate>,
    pub is_off_network: bool,
    pub source_kind: SourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<NetworkSource>,
}

impl ClassifiedPoint {
    /// Straight-line distance from the point to its attachment, recomputed.
    pub fn attachment_distance_m(&self) -> Option<f64> {
        self.nearest_network_point
            .map(|nearest| distance_m(&self.point.position, &nearest))
    }
}
