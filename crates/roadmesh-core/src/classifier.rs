//! On-network / off-network classification.
//!
//! The single place that decides how far a point is from the network and
//! where it attaches. The graph builder consumes its output as-is.

use crate::models::{
    ClassifiedPoint, Coordinate, NetworkSource, PathSegment, PointOfInterest, Polyline, SourceKind,
};
use crate::spatial::nearest_point_on_polyline;

/// Classify a batch of points against the main route and saved segments.
///
/// Points with non-finite or out-of-range coordinates are skipped with a
/// warning; the rest of the batch is still classified.
pub fn classify(
    points: &[PointOfInterest],
    main_route: &Polyline,
    saved_segments: &[PathSegment],
    threshold_m: f64,
) -> Vec<ClassifiedPoint> {
    let main = main_route.cleaned();
    let segments: Vec<Polyline> = saved_segments
        .iter()
        .map(|segment| segment.polyline.cleaned())
        .collect();

    points
        .iter()
        .filter_map(|point| {
            if !point.position.is_valid() {
                tracing::warn!(
                    "Skipping point {} with invalid position ({}, {})",
                    point.id,
                    point.position.lat,
                    point.position.lon
                );
                return None;
            }
            Some(classify_against(point, &main, &segments, threshold_m))
        })
        .collect()
}

/// Classify one point. Polylines are expected to be cleaned already so edge
/// indices line up with what the graph builder sees.
pub(crate) fn classify_against(
    point: &PointOfInterest,
    main_route: &Polyline,
    segments: &[Polyline],
    threshold_m: f64,
) -> ClassifiedPoint {
    let candidates = std::iter::once((None, main_route))
        .chain(segments.iter().enumerate().map(|(idx, line)| (Some(idx), line)));

    let mut best: Option<(f64, Coordinate, NetworkSource)> = None;
    for (segment_index, line) in candidates {
        let projection = nearest_point_on_polyline(&point.position, line.points());
        let (Some(nearest), Some(edge_index)) = (projection.nearest_point, projection.edge_index)
        else {
            continue;
        };
        let source = match segment_index {
            None => NetworkSource::MainRoute { edge_index },
            Some(segment_index) => NetworkSource::SavedSegment {
                segment_index,
                edge_index,
            },
        };
        // Ties go to the later source so a freshly saved segment wins over
        // the geometry it was traced from.
        if best
            .as_ref()
            .map_or(true, |(distance, _, _)| projection.distance <= *distance)
        {
            best = Some((projection.distance, nearest, source));
        }
    }

    match best {
        Some((distance, nearest, source)) => ClassifiedPoint {
            point: point.clone(),
            distance_to_network_m: distance,
            nearest_network_point: Some(nearest),
            is_off_network: distance > threshold_m,
            source_kind: source.kind(),
            source: Some(source),
        },
        // Nothing to be off of: provisionally on-network.
        None => ClassifiedPoint {
            point: point.clone(),
            distance_to_network_m: 0.0,
            nearest_network_point: None,
            is_off_network: false,
            source_kind: SourceKind::None,
            source: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SegmentTag;

    fn equator_route() -> Polyline {
        Polyline::new(vec![Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 1.0)])
    }

    #[test]
    fn point_on_vertex_is_on_network() {
        let point = PointOfInterest::new(1, Coordinate::new(0.0, 0.0));
        let classified = classify(&[point], &equator_route(), &[], 1.0);
        assert_eq!(classified.len(), 1);
        assert!(classified[0].distance_to_network_m < 1e-6);
        assert!(!classified[0].is_off_network);
        assert_eq!(classified[0].source_kind, SourceKind::MainRoute);
    }

    #[test]
    fn far_point_is_off_network() {
        let point = PointOfInterest::new(1, Coordinate::new(0.001, 0.0005));
        let classified = classify(&[point], &equator_route(), &[], 50.0);
        assert!(classified[0].is_off_network);
        assert!((classified[0].distance_to_network_m - 111.19).abs() < 0.1);
    }

    #[test]
    fn empty_network_is_provisionally_on_network() {
        let point = PointOfInterest::new(7, Coordinate::new(10.0, 10.0));
        let classified = classify(&[point], &Polyline::empty(), &[], 10.0);
        assert!(!classified[0].is_off_network);
        assert_eq!(classified[0].source_kind, SourceKind::None);
        assert!(classified[0].nearest_network_point.is_none());
        assert_eq!(classified[0].distance_to_network_m, 0.0);
    }

    #[test]
    fn nearest_saved_segment_wins() {
        let segment = PathSegment::new(
            "track",
            Polyline::new(vec![
                Coordinate::new(0.002, 0.0),
                Coordinate::new(0.002, 0.001),
            ]),
            SegmentTag::OffNetwork,
        );
        let point = PointOfInterest::new(3, Coordinate::new(0.0021, 0.0005));
        let classified = classify(&[point], &equator_route(), &[segment], 20.0);
        assert_eq!(classified[0].source_kind, SourceKind::SavedSegment);
        assert_eq!(
            classified[0].source,
            Some(NetworkSource::SavedSegment {
                segment_index: 0,
                edge_index: 0
            })
        );
        assert!(!classified[0].is_off_network);
    }

    #[test]
    fn bad_point_does_not_abort_batch() {
        let points = vec![
            PointOfInterest::new(1, Coordinate::new(f64::NAN, 0.0)),
            PointOfInterest::new(2, Coordinate::new(0.0, 0.5)),
            PointOfInterest::new(3, Coordinate::new(0.0, f64::INFINITY)),
        ];
        let classified = classify(&points, &equator_route(), &[], 10.0);
        assert_eq!(classified.len(), 1);
        assert_eq!(classified[0].point.id, 2);
    }

    #[test]
    fn degenerate_polylines_are_ignored() {
        let segment = PathSegment::new(
            "stub",
            Polyline::new(vec![Coordinate::new(0.0, 0.0)]),
            SegmentTag::Custom,
        );
        let point = PointOfInterest::new(1, Coordinate::new(0.0, 0.0));
        let classified = classify(&[point], &Polyline::empty(), &[segment], 10.0);
        assert_eq!(classified[0].source_kind, SourceKind::None);
    }
}
