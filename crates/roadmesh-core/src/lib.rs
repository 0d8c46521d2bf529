//! Route network construction and search.
//!
//! A main route, any number of saved path segments and a set of points of
//! interest are stitched into one weighted graph that A* can search. Found
//! paths can be saved back as segments so later queries reuse them.

pub mod classifier;
pub mod error;
pub mod export;
pub mod graph;
pub mod models;
pub mod pathfinder;
pub mod rules;
pub mod segments;
pub mod spatial;

pub use classifier::classify;
pub use error::{Result, RoadmeshError};
pub use export::{
    export_path_details, format_distance, pairwise_distances, PairDistance, PathDetails,
    PathEndpoint, SegmentDetail,
};
pub use graph::{
    build_graph, EdgeId, EdgeKind, GraphBuilder, GraphEdge, GraphNode, GraphSummary, NodeId,
    NodeKind, RouteGraph, StitchCandidate,
};
pub use models::{
    ClassifiedPoint, Coordinate, NetworkSource, PathSegment, PointKind, PointOfInterest, Polyline,
    SegmentTag, SourceKind,
};
pub use pathfinder::{find_path, PathResult};
pub use rules::NetworkRules;
pub use segments::{
    decode_segment_records, encode_segment_records, merge_segments, preview_custom_road,
    segments_from_path, CustomRoadPreview, PathSegmentRecord, SaveGranularity, SaveSummary,
};
pub use spatial::{
    bearing_deg, compass_direction, distance_m, haversine_distance, nearest_point_on_polyline,
    CompassDirection, Projection,
};
