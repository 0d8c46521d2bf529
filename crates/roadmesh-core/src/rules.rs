//! Thresholds and stitching parameters for the route network.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RoadmeshError};

pub const DEFAULT_STITCH_RADIUS_M: f64 = 1000.0;
pub const DEFAULT_MAX_STITCH_NEIGHBORS: usize = 3;
/// Covers any two `approx_eq` coordinates: 1e-6° on both axes is at most
/// ~0.16 m apart.
pub const DEFAULT_COINCIDENT_JOIN_M: f64 = 0.2;

/// Configuration for classification and network stitching.
///
/// The off-network threshold has no default: deployments have used anything
/// from 10 m to 50 m, so callers must choose one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkRules {
    /// Points farther than this from every polyline are off-network (meters)
    pub off_network_threshold_m: f64,
    /// Search radius for stitching candidates (meters)
    #[serde(default = "default_stitch_radius")]
    pub stitch_radius_m: f64,
    /// Maximum neighbours connected per stitched position
    #[serde(default = "default_max_stitch_neighbors")]
    pub max_stitch_neighbors: usize,
    /// Sort main-route candidates ahead of saved-segment candidates
    #[serde(default = "default_prefer_main_route")]
    pub prefer_main_route: bool,
    /// Road nodes this close to a stitched position are always joined (meters)
    #[serde(default = "default_coincident_join")]
    pub coincident_join_m: f64,
}

fn default_stitch_radius() -> f64 {
    DEFAULT_STITCH_RADIUS_M
}

fn default_max_stitch_neighbors() -> usize {
    DEFAULT_MAX_STITCH_NEIGHBORS
}

fn default_prefer_main_route() -> bool {
    true
}

fn default_coincident_join() -> f64 {
    DEFAULT_COINCIDENT_JOIN_M
}

impl NetworkRules {
    pub fn new(off_network_threshold_m: f64) -> Self {
        Self {
            off_network_threshold_m,
            stitch_radius_m: DEFAULT_STITCH_RADIUS_M,
            max_stitch_neighbors: DEFAULT_MAX_STITCH_NEIGHBORS,
            prefer_main_route: true,
            coincident_join_m: DEFAULT_COINCIDENT_JOIN_M,
        }
    }

    pub fn with_stitch_radius(mut self, radius_m: f64) -> Self {
        self.stitch_radius_m = radius_m;
        self
    }

    pub fn with_max_stitch_neighbors(mut self, neighbors: usize) -> Self {
        self.max_stitch_neighbors = neighbors;
        self
    }

    pub fn with_prefer_main_route(mut self, prefer: bool) -> Self {
        self.prefer_main_route = prefer;
        self
    }

    pub fn with_coincident_join(mut self, join_m: f64) -> Self {
        self.coincident_join_m = join_m;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("off_network_threshold_m", self.off_network_threshold_m),
            ("stitch_radius_m", self.stitch_radius_m),
            ("coincident_join_m", self.coincident_join_m),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(RoadmeshError::InvalidRules(format!(
                    "{name} must be a finite, non-negative number (got {value})"
                )));
            }
        }
        Ok(())
    }
}
