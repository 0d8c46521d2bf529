//! Route network server: points, main route, saved segments and path queries.

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use roadmesh_routing::RoutingClient;
use roadmesh_server::{api, config::Config, persistence, state::AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    let filter = EnvFilter::from_default_env().add_directive("roadmesh_server=debug".parse()?);
    let registry = tracing_subscriber::registry().with(filter);
    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting route network server...");
    tracing::info!(
        "Off-network threshold {} m, stitch radius {} m, {} neighbors",
        config.rules.off_network_threshold_m,
        config.rules.stitch_radius_m,
        config.rules.max_stitch_neighbors
    );

    let db = persistence::init_database(&config.database_path, config.database_max_connections)
        .await?;

    if !config.routing.has_api_key() {
        tracing::warn!("ROUTING_API_KEY is not set; routing requests will likely fail");
    }
    let routing = RoutingClient::new(config.routing.clone())?;

    let state = AppState::new(config.rules.clone())
        .with_database(db)
        .with_routing(routing);
    state.load_from_database().await?;
    let state = Arc::new(state);

    let app = api::routes()
        .route("/health", axum::routing::get(|| async { "OK" }))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
