use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use serde::Deserialize;

use meshlogger_common::{MeshLoggerError, MAP_LINK_WINDOW_DAYS};
use meshlogger_engine::{
    build_edges, map_nodes, EdgeFilter, NodeDirectory, NodePositions, NodeSort, WebMercator,
};

use super::{error_response, query_params, success};
use crate::AppState;

/// Zoom levels slippy-map tile servers serve.
const MAX_ZOOM: f64 = 24.0;

#[derive(Deserialize)]
pub struct MapNodesQuery {
    sort: Option<String>,
}

#[derive(Deserialize)]
pub struct MapEdgesQuery {
    zoom: Option<f64>,
    band: Option<String>,
    hide_stale: Option<bool>,
}

/// `GET /api/map/nodes?sort=name|last_updated`
pub async fn api_map_nodes(
    State(state): State<Arc<AppState>>,
    params: Result<Query<MapNodesQuery>, QueryRejection>,
) -> impl IntoResponse {
    let params = match query_params(params) {
        Ok(params) => params,
        Err(e) => return error_response(e),
    };
    let sort = params
        .sort
        .as_deref()
        .and_then(|s| s.parse::<NodeSort>().ok())
        .unwrap_or_default();

    match state.source.load_snapshot(None, None, None).await {
        Ok(snapshot) => success(map_nodes(&snapshot.nodes, sort, Utc::now())),
        Err(e) => error_response(e),
    }
}

/// `GET /api/map/edges?zoom=<level>&band=<mhz>&hide_stale=<bool>`
///
/// Curve offsets are in screen pixels, so clients refetch on zoom change.
pub async fn api_map_edges(
    State(state): State<Arc<AppState>>,
    params: Result<Query<MapEdgesQuery>, QueryRejection>,
) -> impl IntoResponse {
    map_edges(&state, params).await.unwrap_or_else(error_response)
}

async fn map_edges(
    state: &AppState,
    params: Result<Query<MapEdgesQuery>, QueryRejection>,
) -> Result<Response, MeshLoggerError> {
    let params = query_params(params)?;
    let zoom = match params.zoom {
        Some(z) if z.is_finite() && (0.0..=MAX_ZOOM).contains(&z) => z,
        Some(z) => {
            return Err(MeshLoggerError::InvalidParameter(format!(
                "zoom must be between 0 and {MAX_ZOOM}, got {z}"
            )))
        }
        None => {
            return Err(MeshLoggerError::InvalidParameter(
                "Missing zoom parameter.".to_string(),
            ))
        }
    };
    let band = match params.band.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(state.aggregator.resolve_band(raw)?),
        _ => None,
    };

    let now = Utc::now();
    let filter = EdgeFilter {
        band,
        hide_stale: params.hide_stale.unwrap_or(false),
        since: Some(now - Duration::days(MAP_LINK_WINDOW_DAYS)),
    };
    let snapshot = state.source.load_snapshot(None, filter.since, None).await?;

    let directory = NodeDirectory::new(&snapshot.nodes);
    let positions = NodePositions::from_nodes(&snapshot.nodes, &filter, now);
    let edges = build_edges(
        &snapshot.links,
        &positions,
        &directory,
        &filter,
        &WebMercator::new(zoom),
    );
    Ok(success(edges))
}
