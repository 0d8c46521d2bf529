//! Routing service client.
//!
//! Fetches the main drivable route between operator waypoints and snaps
//! single points to the road. Failures are returned to the caller, who
//! treats them as "no main route".

pub mod client;
pub mod error;
pub mod response;

pub use client::{waypoints_param, RoutingClient, RoutingConfig, DEFAULT_ROUTING_URL};
pub use error::RoutingError;
pub use response::{parse_route_response, LegSummary, RouteResponse};
