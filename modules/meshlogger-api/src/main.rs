use std::sync::Arc;

use anyhow::Result;
use axum::{
    http::{header, HeaderValue},
    routing::get,
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use meshlogger_common::Config;
use meshlogger_engine::Aggregator;
use meshlogger_store::{SnapshotSource, SqliteSnapshotStore};

mod rest;

pub struct AppState {
    pub source: Arc<dyn SnapshotSource>,
    pub aggregator: Aggregator,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // Action-style API kept for existing dashboards
        .route("/api", get(rest::api_action))
        // Map
        .route("/api/map/nodes", get(rest::map::api_map_nodes))
        .route("/api/map/edges", get(rest::map::api_map_edges))
        // Chat
        .route("/api/chat", get(rest::api_chat))
        .with_state(state)
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Live data: never cache
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
        // Logging layer: method + path only
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("meshlogger=info".parse()?))
        .init();

    let config = Config::from_env()?;

    let store = SqliteSnapshotStore::connect(&config.database_url).await?;

    let state = Arc::new(AppState {
        source: Arc::new(store),
        aggregator: Aggregator::new(config.bands.clone()),
    });

    let addr = format!("{}:{}", config.web_host, config.web_port);
    let bands: Vec<String> = state.aggregator.bands().iter().map(|b| b.to_string()).collect();
    info!(bands = %bands.join(","), "Mesh logger API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
