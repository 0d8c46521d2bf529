//! Parsing of the routing service's GeoJSON response.

use roadmesh_core::{Coordinate, Polyline};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, RoutingError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegSummary {
    pub distance_m: f64,
    pub time_s: f64,
}

/// The main route as returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResponse {
    pub polyline: Polyline,
    pub distance_m: f64,
    pub time_s: f64,
    pub legs: Vec<LegSummary>,
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Option<Geometry>,
    #[serde(default)]
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: GeometryCoordinates,
}

/// `[lon, lat]` or `[lon, lat, elevation]` positions, one list per leg for
/// a MultiLineString.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeometryCoordinates {
    Multi(Vec<Vec<Vec<f64>>>),
    Single(Vec<Vec<f64>>),
}

#[derive(Debug, Default, Deserialize)]
struct Properties {
    #[serde(default)]
    legs: Vec<Leg>,
    distance: Option<f64>,
    time: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Leg {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    time: f64,
}

/// Turn a routing response body into a route.
///
/// Legs are concatenated in order with the shared junction vertex kept once.
pub fn parse_route_response(body: &Value) -> Result<RouteResponse> {
    let collection = FeatureCollection::deserialize(body)
        .map_err(|e| RoutingError::MalformedResponse(e.to_string()))?;
    let feature = collection
        .features
        .into_iter()
        .next()
        .ok_or(RoutingError::NoRoute)?;
    let geometry = feature
        .geometry
        .ok_or_else(|| RoutingError::MalformedResponse("feature has no geometry".to_string()))?;

    let legs = match geometry.coordinates {
        GeometryCoordinates::Multi(legs) => legs,
        GeometryCoordinates::Single(line) => vec![line],
    };

    let mut points: Vec<Coordinate> = Vec::new();
    for position in legs.into_iter().flatten() {
        let [lon, lat] = match position.as_slice() {
            [lon, lat, ..] => [*lon, *lat],
            _ => continue,
        };
        let coordinate = Coordinate::new(lat, lon);
        if points.last().is_some_and(|last| last.approx_eq(&coordinate)) {
            continue;
        }
        points.push(coordinate);
    }
    if points.is_empty() {
        return Err(RoutingError::NoRoute);
    }

    let leg_summaries: Vec<LegSummary> = feature
        .properties
        .legs
        .iter()
        .map(|leg| LegSummary {
            distance_m: leg.distance,
            time_s: leg.time,
        })
        .collect();
    let distance_m = if leg_summaries.is_empty() {
        feature.properties.distance.unwrap_or(0.0)
    } else {
        leg_summaries.iter().map(|leg| leg.distance_m).sum()
    };
    let time_s = if leg_summaries.is_empty() {
        feature.properties.time.unwrap_or(0.0)
    } else {
        leg_summaries.iter().map(|leg| leg.time_s).sum()
    };

    Ok(RouteResponse {
        polyline: Polyline::new(points),
        distance_m,
        time_s,
        legs: leg_summaries,
    })
}
