//! Segment persistence adapter.
//!
//! Turns found paths and operator-drawn roads into [`PathSegment`]s and owns
//! the stored record format, including every legacy shape it has had.
//! Nothing outside this module sees a stored record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, RoadmeshError};
use crate::graph::{EdgeKind, GraphBuilder, StitchCandidate};
use crate::models::{Coordinate, PathSegment, Polyline, SegmentTag};
use crate::pathfinder::PathResult;
use crate::rules::NetworkRules;

/// How a found path is cut into segments when saved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveGranularity {
    /// One segment per traversed edge. Virtual connectors are saved as
    /// off-road traversal.
    PerEdge,
    /// One segment per maximal run of road or non-road edges. Virtual
    /// connectors are saved as off-road traversal.
    #[default]
    MergedRuns,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveSummary {
    pub segments: Vec<PathSegment>,
    pub saved_length_m: f64,
    /// Traversed length that produced no segment
    pub skipped_length_m: f64,
    /// Always the path distance
    pub total_length_m: f64,
}

/// Cut a path into segments ready to be merged into the saved set.
pub fn segments_from_path(
    result: &PathResult,
    label: &str,
    granularity: SaveGranularity,
) -> SaveSummary {
    let mut segments = Vec::new();
    let mut saved_length_m = 0.0;
    let mut skipped_length_m = 0.0;

    match granularity {
        SaveGranularity::PerEdge => {
            let mut count = 0usize;
            for edge in &result.edges {
                // Connectors are kept as off-road traversal; dropping them
                // lets a rebuild stitch the saved edges differently.
                let tag = match edge.kind {
                    EdgeKind::Road => SegmentTag::OnNetwork,
                    EdgeKind::OffRoad | EdgeKind::Virtual => SegmentTag::OffNetwork,
                };
                let polyline = edge.positions.cleaned();
                if polyline.len() < 2 {
                    skipped_length_m += edge.weight;
                    continue;
                }
                count += 1;
                saved_length_m += edge.weight;
                segments.push(PathSegment::new(format!("{label} #{count}"), polyline, tag));
            }
        }
        SaveGranularity::MergedRuns => {
            let runs = merged_runs(result);
            let total_runs = runs.iter().filter(|run| run.polyline.len() >= 2).count();
            let mut count = 0usize;
            for run in runs {
                if run.polyline.len() < 2 {
                    skipped_length_m += run.weight;
                    continue;
                }
                count += 1;
                saved_length_m += run.weight;
                let run_label = if total_runs == 1 {
                    label.to_string()
                } else {
                    format!("{label} ({count}/{total_runs})")
                };
                let tag = if run.off_road {
                    SegmentTag::OffNetwork
                } else {
                    SegmentTag::OnNetwork
                };
                segments.push(PathSegment::new(run_label, run.polyline, tag));
            }
        }
    }

    tracing::debug!(
        "Cut path into {} segments ({:.1} m saved, {:.1} m skipped)",
        segments.len(),
        saved_length_m,
        skipped_length_m
    );
    SaveSummary {
        segments,
        saved_length_m,
        skipped_length_m,
        total_length_m: result.distance,
    }
}

struct Run {
    off_road: bool,
    polyline: Polyline,
    weight: f64,
}

fn merged_runs(result: &PathResult) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    let mut points: Vec<Coordinate> = Vec::new();
    let mut weight = 0.0;
    let mut current: Option<bool> = None;

    for edge in &result.edges {
        let off_road = edge.kind != EdgeKind::Road;
        if current.is_some_and(|class| class != off_road) {
            let joint = points.last().copied();
            runs.push(Run {
                off_road: !off_road,
                polyline: Polyline::new(std::mem::take(&mut points)).cleaned(),
                weight,
            });
            weight = 0.0;
            points.extend(joint);
        }
        current = Some(off_road);
        weight += edge.weight;
        for point in edge.positions.points() {
            if points.last().is_some_and(|last| last.approx_eq(point)) {
                continue;
            }
            points.push(*point);
        }
    }
    if let Some(off_road) = current {
        runs.push(Run {
            off_road,
            polyline: Polyline::new(points).cleaned(),
            weight,
        });
    }
    runs
}

/// Append `new` to `existing`, skipping segments whose geometry is already
/// saved. Returns how many were added.
pub fn merge_segments(existing: &mut Vec<PathSegment>, new: Vec<PathSegment>) -> usize {
    let mut added = 0;
    for segment in new {
        if existing.iter().any(|saved| saved.same_geometry(&segment)) {
            tracing::debug!("Segment '{}' already saved, skipping", segment.label);
            continue;
        }
        existing.push(segment);
        added += 1;
    }
    added
}

/// The stored record shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathSegmentRecord {
    pub label: String,
    pub positions: Vec<Coordinate>,
    pub is_off_road: bool,
    pub distance: f64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub custom: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<&PathSegment> for PathSegmentRecord {
    fn from(segment: &PathSegment) -> Self {
        Self {
            label: segment.label.clone(),
            positions: segment.polyline.points().to_vec(),
            is_off_road: segment.tag.is_off_network(),
            distance: segment.length_m,
            custom: segment.tag == SegmentTag::Custom,
            created_at: Some(segment.created_at),
        }
    }
}

/// Coordinates as written over the years: objects, or GeoJSON `[lon, lat]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredCoordinate {
    // Tried first: Coordinate would also accept a two-element array as (lat, lon).
    Pair([f64; 2]),
    Object(Coordinate),
}

impl StoredCoordinate {
    fn into_coordinate(self) -> Coordinate {
        match self {
            StoredCoordinate::Object(coordinate) => coordinate,
            StoredCoordinate::Pair([lon, lat]) => Coordinate::new(lat, lon),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    #[serde(default, alias = "name")]
    label: Option<String>,
    #[serde(alias = "path", alias = "coords", alias = "coordinates")]
    positions: Vec<StoredCoordinate>,
    #[serde(default, alias = "offRoad", alias = "is_off_road")]
    is_off_road: Option<bool>,
    #[serde(default, alias = "length", alias = "distanceMeters")]
    distance: Option<f64>,
    #[serde(default)]
    custom: Option<bool>,
    #[serde(default, alias = "created_at")]
    created_at: Option<DateTime<Utc>>,
}

impl StoredRecord {
    fn into_segment(self, index: usize) -> Option<PathSegment> {
        let label = self
            .label
            .filter(|label| !label.trim().is_empty())
            .unwrap_or_else(|| format!("segment-{}", index + 1));
        let polyline = Polyline::new(
            self.positions
                .into_iter()
                .map(StoredCoordinate::into_coordinate)
                .collect(),
        )
        .cleaned();
        if polyline.len() < 2 {
            tracing::warn!("Dropping stored segment '{label}': fewer than two valid positions");
            return None;
        }
        let tag = if self.custom.unwrap_or(false) {
            SegmentTag::Custom
        } else if self.is_off_road.unwrap_or(false) {
            SegmentTag::OffNetwork
        } else {
            SegmentTag::OnNetwork
        };
        let mut segment = PathSegment::new(label, polyline, tag);
        if let Some(distance) = self.distance.filter(|d| d.is_finite() && *d >= 0.0) {
            segment.length_m = distance;
        }
        if let Some(created_at) = self.created_at {
            segment.created_at = created_at;
        }
        Some(segment)
    }
}

/// Decode the stored segment list.
///
/// Accepts a bare list or a `{"segments": [...]}` / `{"paths": [...]}`
/// wrapper. Individual malformed records are dropped with a warning; only a
/// payload that is not a list at all is an error.
pub fn decode_segment_records(json: &str) -> Result<Vec<PathSegment>> {
    let value: Value = serde_json::from_str(json)?;
    let records = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(records) => records,
        Value::Object(mut map) => match map.remove("segments").or_else(|| map.remove("paths")) {
            Some(Value::Array(records)) => records,
            _ => {
                return Err(RoadmeshError::InvalidSegmentData(
                    "object without a segments list".to_string(),
                ))
            }
        },
        other => {
            return Err(RoadmeshError::InvalidSegmentData(format!(
                "expected a list of segments, got {other}"
            )))
        }
    };

    let segments: Vec<PathSegment> = records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| match serde_json::from_value::<StoredRecord>(record) {
            Ok(record) => record.into_segment(index),
            Err(e) => {
                tracing::warn!("Dropping unreadable stored segment {}: {}", index, e);
                None
            }
        })
        .collect();
    Ok(segments)
}

/// Encode segments in the current record shape.
pub fn encode_segment_records(segments: &[PathSegment]) -> Result<String> {
    let records: Vec<PathSegmentRecord> = segments.iter().map(PathSegmentRecord::from).collect();
    Ok(serde_json::to_string(&records)?)
}

/// A custom road as it would join the network if saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomRoadPreview {
    pub segment: PathSegment,
    pub start_candidates: Vec<StitchCandidate>,
    pub end_candidates: Vec<StitchCandidate>,
}

/// Shape an operator-drawn polyline into a custom segment and report where
/// its endpoints would be stitched. Nothing is persisted. `None` when the
/// polyline has fewer than two usable vertices.
pub fn preview_custom_road(
    polyline: &Polyline,
    label: &str,
    main_route: &Polyline,
    saved_segments: &[PathSegment],
    rules: &NetworkRules,
) -> Option<CustomRoadPreview> {
    let line = polyline.cleaned();
    let (start, end) = match (line.first(), line.last()) {
        (Some(start), Some(end)) if line.len() >= 2 => (*start, *end),
        _ => return None,
    };

    let mut builder = GraphBuilder::new(rules);
    builder
        .add_main_route(main_route)
        .add_saved_segments(saved_segments);

    Some(CustomRoadPreview {
        start_candidates: builder.stitch_candidates(&start),
        end_candidates: builder.stitch_candidates(&end),
        segment: PathSegment::new(label, line, SegmentTag::Custom),
    })
}
