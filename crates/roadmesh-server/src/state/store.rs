//! In-memory state store using DashMap.

use anyhow::Result;
use dashmap::DashMap;
use roadmesh_core::{
    build_graph, classify, merge_segments, ClassifiedPoint, Coordinate, NetworkRules,
    PathSegment, PointOfInterest, Polyline, RouteGraph,
};
use roadmesh_routing::RoutingClient;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

use crate::persistence::{segments as segment_store, Database};

#[derive(Debug, Clone, PartialEq)]
pub enum AddPointOutcome {
    Added(PointOfInterest),
    Invalid,
    /// An existing point already sits at this position.
    Duplicate(u64),
}

/// Application state: points, main route, saved segments.
///
/// The route graph is never cached. Every query rebuilds it from a
/// consistent snapshot of the three inputs.
pub struct AppState {
    points: DashMap<u64, PointOfInterest>,
    /// Serialises the duplicate scan with the insert
    point_insert: Mutex<()>,
    point_counter: AtomicU64,
    main_route: RwLock<Polyline>,
    route_generation: AtomicU64,
    segments: tokio::sync::RwLock<Vec<PathSegment>>,
    rules: NetworkRules,
    db: Option<Database>,
    routing: Option<RoutingClient>,
}

impl AppState {
    pub fn new(rules: NetworkRules) -> Self {
        Self {
            points: DashMap::new(),
            point_insert: Mutex::new(()),
            point_counter: AtomicU64::new(1),
            main_route: RwLock::new(Polyline::empty()),
            route_generation: AtomicU64::new(0),
            segments: tokio::sync::RwLock::new(Vec::new()),
            rules,
            db: None,
            routing: None,
        }
    }

    pub fn with_database(mut self, db: Database) -> Self {
        self.db = Some(db);
        self
    }

    pub fn with_routing(mut self, client: RoutingClient) -> Self {
        self.routing = Some(client);
        self
    }

    pub fn rules(&self) -> &NetworkRules {
        &self.rules
    }

    pub fn routing(&self) -> Option<&RoutingClient> {
        self.routing.as_ref()
    }

    /// Load saved segments from the database, if one is attached.
    pub async fn load_from_database(&self) -> Result<()> {
        let Some(db) = &self.db else {
            return Ok(());
        };
        let loaded = segment_store::load_segments(db.pool()).await?;
        tracing::info!("Loaded {} saved path segments", loaded.len());
        *self.segments.write().await = loaded;
        Ok(())
    }

    // ==== Points ====

    pub fn add_point(&self, mut point: PointOfInterest) -> AddPointOutcome {
        if !point.position.is_valid() {
            return AddPointOutcome::Invalid;
        }
        let _guard = self
            .point_insert
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = self
            .points
            .iter()
            .find(|entry| entry.value().position.approx_eq(&point.position))
        {
            return AddPointOutcome::Duplicate(*existing.key());
        }
        point.id = self.point_counter.fetch_add(1, Ordering::SeqCst);
        self.points.insert(point.id, point.clone());
        AddPointOutcome::Added(point)
    }

    pub fn get_point(&self, id: u64) -> Option<PointOfInterest> {
        self.points.get(&id).map(|entry| entry.value().clone())
    }

    /// All points in id order.
    pub fn get_points(&self) -> Vec<PointOfInterest> {
        let mut points: Vec<PointOfInterest> =
            self.points.iter().map(|entry| entry.value().clone()).collect();
        points.sort_by_key(|point| point.id);
        points
    }

    pub fn remove_point(&self, id: u64) -> bool {
        self.points.remove(&id).is_some()
    }

    pub fn clear_points(&self) -> usize {
        let count = self.points.len();
        self.points.clear();
        count
    }

    // ==== Main route ====

    pub fn main_route(&self) -> Polyline {
        self.main_route
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the main route and invalidate any routing request in flight.
    pub fn set_main_route(&self, route: Polyline) {
        self.route_generation.fetch_add(1, Ordering::SeqCst);
        *self
            .main_route
            .write()
            .unwrap_or_else(PoisonError::into_inner) = route;
    }

    pub fn clear_main_route(&self) {
        self.set_main_route(Polyline::empty());
    }

    /// Start a routing request; the returned generation identifies it.
    pub fn begin_route_request(&self) -> u64 {
        self.route_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Apply the outcome of a routing request unless a newer request or a
    /// direct route change happened since. `None` clears the route.
    pub fn finish_route_request(&self, generation: u64, route: Option<Polyline>) -> bool {
        let mut current = self
            .main_route
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if self.route_generation.load(Ordering::SeqCst) != generation {
            tracing::debug!("Discarding stale routing response (generation {})", generation);
            return false;
        }
        *current = route.unwrap_or_default();
        true
    }

    // ==== Saved segments ====

    pub async fn segments(&self) -> Vec<PathSegment> {
        self.segments.read().await.clone()
    }

    /// Merge new segments into the saved set and persist the whole list.
    /// Returns how many were added.
    pub async fn add_segments(&self, new: Vec<PathSegment>) -> Result<usize> {
        let mut segments = self.segments.write().await;
        let mut merged = segments.clone();
        let added = merge_segments(&mut merged, new);
        if added == 0 {
            return Ok(0);
        }
        if let Some(db) = &self.db {
            segment_store::save_segments(db.pool(), &merged).await?;
        }
        *segments = merged;
        tracing::info!("Saved {} new path segments ({} total)", added, segments.len());
        Ok(added)
    }

    pub async fn clear_segments(&self) -> Result<usize> {
        let mut segments = self.segments.write().await;
        if let Some(db) = &self.db {
            segment_store::clear_segments(db.pool()).await?;
        }
        let count = segments.len();
        segments.clear();
        Ok(count)
    }

    // ==== Derived network ====

    /// Snapshot of the three network inputs.
    pub async fn network_inputs(&self) -> (Polyline, Vec<PathSegment>, Vec<PointOfInterest>) {
        let segments = self.segments().await;
        (self.main_route(), segments, self.get_points())
    }

    pub async fn classified_points(&self) -> Vec<ClassifiedPoint> {
        let (route, segments, points) = self.network_inputs().await;
        classify(&points, &route, &segments, self.rules.off_network_threshold_m)
    }

    /// Classify a bare position against the current network, as if it were
    /// a point. `None` for an invalid position.
    pub async fn classify_position(&self, position: Coordinate) -> Option<ClassifiedPoint> {
        let segments = self.segments().await;
        classify(
            &[PointOfInterest::new(0, position)],
            &self.main_route(),
            &segments,
            self.rules.off_network_threshold_m,
        )
        .pop()
    }

    pub async fn route_graph(&self) -> RouteGraph {
        let (route, segments, points) = self.network_inputs().await;
        let classified = classify(&points, &route, &segments, self.rules.off_network_threshold_m);
        build_graph(&route, &segments, &classified, &self.rules)
    }
}
