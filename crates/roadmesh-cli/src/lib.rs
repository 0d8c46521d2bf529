//! Roadmesh CLI - scenario files in, JSON out.
//!
//! A scenario is a JSON document with a main route, saved segments and
//! points. The `roadmesh` binary classifies, builds and searches it.

pub mod scenario;

pub use scenario::{parse_endpoint, parse_waypoints, Scenario};
