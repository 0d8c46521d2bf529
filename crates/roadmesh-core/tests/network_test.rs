//! End-to-end tests over the public API: classify, build, search, save,
//! rebuild.

use roadmesh_core::{
    build_graph, classify, distance_m, find_path, merge_segments, segments_from_path,
    Coordinate, EdgeKind, NetworkRules, NodeId, PathSegment, PointOfInterest, Polyline,
    RouteGraph, SaveGranularity, SegmentTag,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn line(points: &[(f64, f64)]) -> Polyline {
    Polyline::new(
        points
            .iter()
            .map(|&(lat, lon)| Coordinate::new(lat, lon))
            .collect(),
    )
}

fn build(
    route: &Polyline,
    segments: &[PathSegment],
    points: &[PointOfInterest],
    rules: &NetworkRules,
) -> RouteGraph {
    let classified = classify(points, route, segments, rules.off_network_threshold_m);
    build_graph(route, segments, &classified, rules)
}

#[test]
fn off_network_point_reaches_route_start_in_two_edges() {
    let route = line(&[(0.0, 0.0), (0.0, 1.0)]);
    let points = vec![PointOfInterest::new(1, Coordinate::new(0.001, 0.0005))];
    let rules = NetworkRules::new(50.0);

    let classified = classify(&points, &route, &[], rules.off_network_threshold_m);
    assert!(classified[0].is_off_network);

    let graph = build_graph(&route, &[], &classified, &rules);
    let result = find_path(&graph, &NodeId::for_point(1), &NodeId::new("route:0"))
        .unwrap()
        .expect("point is attached to the route");

    assert_eq!(result.edges.len(), 2);
    assert_eq!(result.edges[0].kind, EdgeKind::Virtual);
    assert_eq!(result.edges[1].kind, EdgeKind::Road);

    let attach = distance_m(&Coordinate::new(0.001, 0.0005), &Coordinate::new(0.0, 0.0005));
    let along = distance_m(&Coordinate::new(0.0, 0.0005), &Coordinate::new(0.0, 0.0));
    assert!((result.distance - (attach + along)).abs() < 1e-6);
}

#[test]
fn distant_segments_without_route_are_unreachable() {
    let west = PathSegment::new(
        "west",
        line(&[(40.0, -100.0), (40.0, -99.99)]),
        SegmentTag::OffNetwork,
    );
    let east = PathSegment::new(
        "east",
        line(&[(40.0, 10.0), (40.0, 10.01)]),
        SegmentTag::OffNetwork,
    );
    let points = vec![
        PointOfInterest::new(1, Coordinate::new(40.0, -99.995)),
        PointOfInterest::new(2, Coordinate::new(40.0, 10.005)),
    ];
    let rules = NetworkRules::new(20.0);
    let graph = build(&Polyline::empty(), &[west, east], &points, &rules);

    let result = find_path(&graph, &NodeId::for_point(1), &NodeId::for_point(2)).unwrap();
    assert!(result.is_none());
}

#[test]
fn empty_network_point_has_no_path() {
    let points = vec![
        PointOfInterest::new(1, Coordinate::new(1.0, 1.0)),
        PointOfInterest::new(2, Coordinate::new(1.0, 1.001)),
    ];
    let rules = NetworkRules::new(20.0);
    let graph = build(&Polyline::empty(), &[], &points, &rules);
    let result = find_path(&graph, &NodeId::for_point(1), &NodeId::for_point(2)).unwrap();
    assert!(result.is_none());
}

#[test]
fn rebuilding_gives_same_counts_and_weight() {
    let route = line(&[(27.70, 85.30), (27.701, 85.302), (27.703, 85.303)]);
    let segments = vec![PathSegment::new(
        "shortcut",
        line(&[(27.7005, 85.3035), (27.702, 85.3045)]),
        SegmentTag::Custom,
    )];
    let points = vec![
        PointOfInterest::new(1, Coordinate::new(27.7002, 85.3001)),
        PointOfInterest::new(2, Coordinate::new(27.7021, 85.3046)),
    ];
    let rules = NetworkRules::new(25.0);
    let a = build(&route, &segments, &points, &rules);
    let b = build(&route, &segments, &points, &rules);
    assert_eq!(a.edge_count(), b.edge_count());
    assert_eq!(a.total_weight(), b.total_weight());
}

#[test]
fn path_cost_never_beats_straight_line() {
    let route = line(&[(0.0, 0.0), (0.001, 0.001), (0.0, 0.002), (0.001, 0.003)]);
    let segments = vec![PathSegment::new(
        "loop",
        line(&[(0.002, 0.0), (0.003, 0.0015), (0.002, 0.003)]),
        SegmentTag::OffNetwork,
    )];
    let points = vec![
        PointOfInterest::new(1, Coordinate::new(-0.0005, 0.0)),
        PointOfInterest::new(2, Coordinate::new(0.0025, 0.0028)),
        PointOfInterest::new(3, Coordinate::new(0.0031, 0.0012)),
        PointOfInterest::new(4, Coordinate::new(0.0004, 0.0021)),
    ];
    let rules = NetworkRules::new(20.0);
    let graph = build(&route, &segments, &points, &rules);

    for from in &points {
        for to in &points {
            let result = find_path(
                &graph,
                &NodeId::for_point(from.id),
                &NodeId::for_point(to.id),
            )
            .unwrap()
            .expect("all points share one network");
            let straight = distance_m(&from.position, &to.position);
            assert!(result.distance + 1e-9 >= straight);
        }
    }
}

#[test]
fn saved_path_does_not_lengthen_the_same_query() {
    let route = line(&[(0.0, 0.0), (0.0, 0.001), (0.0, 0.002)]);
    let points = vec![
        PointOfInterest::new(1, Coordinate::new(0.0005, 0.0)),
        PointOfInterest::new(2, Coordinate::new(0.0005, 0.002)),
    ];
    let rules = NetworkRules::new(20.0);
    let from = NodeId::for_point(1);
    let to = NodeId::for_point(2);

    for granularity in [SaveGranularity::MergedRuns, SaveGranularity::PerEdge] {
        let mut saved: Vec<PathSegment> = Vec::new();
        let graph = build(&route, &saved, &points, &rules);
        let original = find_path(&graph, &from, &to).unwrap().unwrap();

        let summary = segments_from_path(&original, "trip", granularity);
        assert!(
            (summary.saved_length_m + summary.skipped_length_m - original.distance).abs() < 1e-6
        );
        merge_segments(&mut saved, summary.segments);

        let rebuilt = build(&route, &saved, &points, &rules);
        let again = find_path(&rebuilt, &from, &to)
            .unwrap()
            .expect("saved path keeps the points connected");
        assert!(again.distance <= original.distance + 1e-6);
    }
}

/// Half-width of the random scenario box. Its diagonal stays inside the
/// default stitching radius, so every scenario is one connected network.
const SCENARIO_SPAN_DEG: f64 = 0.003;
const SCENARIO_ROUNDS: usize = 400;

fn random_coordinate(rng: &mut StdRng) -> Coordinate {
    Coordinate::new(
        rng.random_range(-SCENARIO_SPAN_DEG..SCENARIO_SPAN_DEG),
        rng.random_range(-SCENARIO_SPAN_DEG..SCENARIO_SPAN_DEG),
    )
}

fn random_line(rng: &mut StdRng, vertices: usize) -> Polyline {
    Polyline::new((0..vertices).map(|_| random_coordinate(rng)).collect())
}

#[test]
fn saving_random_paths_never_lengthens_them() {
    let rules = NetworkRules::new(20.0);
    let from = NodeId::for_point(0);
    let to = NodeId::for_point(3);
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut checked = 0;

    for _ in 0..SCENARIO_ROUNDS {
        let route_vertices = rng.random_range(2..6);
        let route = random_line(&mut rng, route_vertices);
        let segment_count = rng.random_range(0..3);
        let mut segments = Vec::new();
        for index in 0..segment_count {
            let vertices = rng.random_range(2..4);
            let tag = if rng.random_bool(0.5) {
                SegmentTag::OffNetwork
            } else {
                SegmentTag::Custom
            };
            segments.push(PathSegment::new(
                format!("fragment {index}"),
                random_line(&mut rng, vertices),
                tag,
            ));
        }
        let points: Vec<PointOfInterest> = (0..4u64)
            .map(|id| PointOfInterest::new(id, random_coordinate(&mut rng)))
            .collect();

        let graph = build(&route, &segments, &points, &rules);
        let Some(original) = find_path(&graph, &from, &to).unwrap() else {
            continue;
        };
        checked += 1;

        for granularity in [SaveGranularity::MergedRuns, SaveGranularity::PerEdge] {
            let mut saved = segments.clone();
            let summary = segments_from_path(&original, "trip", granularity);
            merge_segments(&mut saved, summary.segments);

            let rebuilt = build(&route, &saved, &points, &rules);
            let again = find_path(&rebuilt, &from, &to)
                .unwrap()
                .expect("saved path keeps the points connected");
            assert!(
                again.distance <= original.distance + 1e-6,
                "{granularity:?}: {:.3} m became {:.3} m",
                original.distance,
                again.distance
            );
        }
    }
    assert!(checked > SCENARIO_ROUNDS / 2);
}

#[test]
fn bad_points_are_skipped_not_fatal() {
    let route = line(&[(0.0, 0.0), (0.0, 0.001)]);
    let mut points: Vec<PointOfInterest> = (0..50)
        .map(|i| PointOfInterest::new(i, Coordinate::new(0.0001, 0.00001 * i as f64)))
        .collect();
    points[10].position = Coordinate::new(f64::NAN, 0.0);
    points[20].position = Coordinate::new(0.0, f64::INFINITY);

    let rules = NetworkRules::new(20.0);
    let graph = build(&route, &[], &points, &rules);
    assert!(graph.point_node_id(10).is_none());
    assert!(graph.point_node_id(20).is_none());
    assert!(graph.point_node_id(49).is_some());
    assert!(find_path(&graph, &NodeId::for_point(0), &NodeId::for_point(49))
        .unwrap()
        .is_some());
}
