//! API routes for the route network server.

pub mod network;
pub mod paths;
pub mod points;
pub mod route;
mod routes;
pub mod segments;

use axum::Router;

pub fn routes() -> Router<std::sync::Arc<crate::state::AppState>> {
    routes::create_router()
}

#[cfg(test)]
mod tests;
