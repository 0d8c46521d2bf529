//! Spatial math: distances, bearings and projection onto polylines.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::Coordinate;

/// Spherical earth radius used by every distance in the crate.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Calculate distance between two points in meters using Haversine formula.
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Great-circle distance between two coordinates in meters.
pub fn distance_m(a: &Coordinate, b: &Coordinate) -> f64 {
    haversine_distance(a.lat, a.lon, b.lat, b.lon)
}

/// Sum of consecutive great-circle distances.
pub fn polyline_length_m(points: &[Coordinate]) -> f64 {
    points
        .windows(2)
        .map(|pair| distance_m(&pair[0], &pair[1]))
        .sum()
}

/// Initial compass bearing from `from` to `to`, in degrees within [0, 360).
pub fn bearing_deg(from: &Coordinate, to: &Coordinate) -> f64 {
    let phi1 = from.lat.to_radians();
    let phi2 = to.lat.to_radians();
    let delta_lambda = (to.lon - from.lon).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    let bearing = x.atan2(y).to_degrees().rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if bearing >= 360.0 {
        0.0
    } else {
        bearing
    }
}

/// Eight-way compass label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompassDirection {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

const COMPASS_TABLE: [CompassDirection; 8] = [
    CompassDirection::N,
    CompassDirection::NE,
    CompassDirection::E,
    CompassDirection::SE,
    CompassDirection::S,
    CompassDirection::SW,
    CompassDirection::W,
    CompassDirection::NW,
];

impl CompassDirection {
    /// Quantize a bearing into 45 degree buckets centered on each label.
    pub fn from_bearing(bearing_deg: f64) -> Self {
        if !bearing_deg.is_finite() {
            return CompassDirection::N;
        }
        let snapped = ((bearing_deg / 45.0).round() * 45.0).rem_euclid(360.0);
        let index = (snapped / 45.0).round() as usize % COMPASS_TABLE.len();
        COMPASS_TABLE[index]
    }

    pub fn label(self) -> &'static str {
        match self {
            CompassDirection::N => "N",
            CompassDirection::NE => "NE",
            CompassDirection::E => "E",
            CompassDirection::SE => "SE",
            CompassDirection::S => "S",
            CompassDirection::SW => "SW",
            CompassDirection::W => "W",
            CompassDirection::NW => "NW",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CompassDirection::N => "north",
            CompassDirection::NE => "north-east",
            CompassDirection::E => "east",
            CompassDirection::SE => "south-east",
            CompassDirection::S => "south",
            CompassDirection::SW => "south-west",
            CompassDirection::W => "west",
            CompassDirection::NW => "north-west",
        }
    }
}

impl fmt::Display for CompassDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn compass_direction(bearing_deg: f64) -> CompassDirection {
    CompassDirection::from_bearing(bearing_deg)
}

// ==== Local ENU scaling ====

/// Meters per degree of latitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lat(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_132.954 - 559.822 * (2.0 * lat_rad).cos() + 1.175 * (4.0 * lat_rad).cos()
        - 0.0023 * (6.0 * lat_rad).cos()
}

/// Meters per degree of longitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lon(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_412.84 * lat_rad.cos() - 93.5 * (3.0 * lat_rad).cos() + 0.118 * (5.0 * lat_rad).cos()
}

/// Closest location on a polyline to a point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    /// Distance from the point to `nearest_point`, meters.
    pub distance: f64,
    pub nearest_point: Option<Coordinate>,
    /// Index of the polyline edge (vertex `i` to `i + 1`) the projection fell on.
    pub edge_index: Option<usize>,
}

impl Projection {
    pub const NONE: Projection = Projection {
        distance: 0.0,
        nearest_point: None,
        edge_index: None,
    };
}

/// Project `point` onto the closest edge of `polyline`.
///
/// Each edge is projected in a local east/north frame anchored at the edge
/// start, the parameter is clamped to the edge, and the reported distance is
/// the great-circle distance to the projected location. Fewer than two
/// vertices (or a non-finite point) yields [`Projection::NONE`]: no
/// attachment is possible, which is not an error.
pub fn nearest_point_on_polyline(point: &Coordinate, polyline: &[Coordinate]) -> Projection {
    if polyline.len() < 2 || !point.is_finite() {
        return Projection::NONE;
    }

    let mut best = Projection::NONE;
    let mut best_distance = f64::INFINITY;
    for (index, pair) in polyline.windows(2).enumerate() {
        let (start, end) = (&pair[0], &pair[1]);
        if !start.is_finite() || !end.is_finite() {
            continue;
        }
        let nearest = project_onto_segment(point, start, end);
        let distance = distance_m(point, &nearest);
        if distance < best_distance {
            best_distance = distance;
            best = Projection {
                distance,
                nearest_point: Some(nearest),
                edge_index: Some(index),
            };
        }
    }
    best
}

fn project_onto_segment(point: &Coordinate, start: &Coordinate, end: &Coordinate) -> Coordinate {
    let ref_lat = start.lat;
    let m_lat = meters_per_deg_lat(ref_lat);
    let m_lon = meters_per_deg_lon(ref_lat);

    let px = (point.lon - start.lon) * m_lon;
    let py = (point.lat - start.lat) * m_lat;
    let sx = (end.lon - start.lon) * m_lon;
    let sy = (end.lat - start.lat) * m_lat;

    let seg_len_sq = sx * sx + sy * sy;
    if seg_len_sq < 1e-8 {
        return *start;
    }

    // t = ((P-A) . (B-A)) / |B-A|^2
    let t = ((px * sx + py * sy) / seg_len_sq).clamp(0.0, 1.0);
    Coordinate::new(
        start.lat + t * (end.lat - start.lat),
        start.lon + t * (end.lon - start.lon),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // ~111km between these points (1 degree latitude)
        let dist = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 111_194.0).abs() < 100.0);
    }

    #[test]
    fn distance_to_self_is_zero() {
        let a = Coordinate::new(27.696354, 85.336537);
        assert_eq!(distance_m(&a, &a), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Coordinate::new(27.696354, 85.336537);
        let b = Coordinate::new(28.90258, 80.34553);
        assert_eq!(distance_m(&a, &b), distance_m(&b, &a));
    }

    #[test]
    fn bearing_cardinal_points() {
        let origin = Coordinate::new(0.0, 0.0);
        assert!(bearing_deg(&origin, &Coordinate::new(1.0, 0.0)).abs() < 1e-9);
        assert!((bearing_deg(&origin, &Coordinate::new(0.0, 1.0)) - 90.0).abs() < 1e-9);
        assert!((bearing_deg(&origin, &Coordinate::new(-1.0, 0.0)) - 180.0).abs() < 1e-9);
        assert!((bearing_deg(&origin, &Coordinate::new(0.0, -1.0)) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn compass_buckets_are_centered() {
        assert_eq!(compass_direction(0.0), CompassDirection::N);
        assert_eq!(compass_direction(22.4), CompassDirection::N);
        assert_eq!(compass_direction(22.6), CompassDirection::NE);
        assert_eq!(compass_direction(135.0), CompassDirection::SE);
        assert_eq!(compass_direction(250.0), CompassDirection::W);
        assert_eq!(compass_direction(337.6), CompassDirection::N);
        assert_eq!(compass_direction(359.9), CompassDirection::N);
    }

    #[test]
    fn projection_needs_two_vertices() {
        let p = Coordinate::new(1.0, 1.0);
        assert_eq!(nearest_point_on_polyline(&p, &[]), Projection::NONE);
        assert_eq!(
            nearest_point_on_polyline(&p, &[Coordinate::new(0.0, 0.0)]),
            Projection::NONE
        );
    }

    #[test]
    fn projection_lands_mid_edge() {
        let line = [Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 1.0)];
        let p = Coordinate::new(0.001, 0.0005);
        let projection = nearest_point_on_polyline(&p, &line);
        let nearest = projection.nearest_point.unwrap();
        assert!(nearest.lat.abs() < 1e-12);
        assert!((nearest.lon - 0.0005).abs() < 1e-9);
        assert!((projection.distance - 111.19).abs() < 0.1);
        assert_eq!(projection.edge_index, Some(0));
    }

    #[test]
    fn projection_clamps_to_endpoint() {
        let line = [Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 0.01)];
        let p = Coordinate::new(0.0, -0.001);
        let projection = nearest_point_on_polyline(&p, &line);
        assert_eq!(projection.nearest_point, Some(Coordinate::new(0.0, 0.0)));
    }

    #[test]
    fn projection_picks_closest_edge() {
        let line = [
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 0.01),
            Coordinate::new(0.01, 0.01),
        ];
        let p = Coordinate::new(0.005, 0.0101);
        let projection = nearest_point_on_polyline(&p, &line);
        assert_eq!(projection.edge_index, Some(1));
        assert!(projection.distance < 12.0);
    }
}
