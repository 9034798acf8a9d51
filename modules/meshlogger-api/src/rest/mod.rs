pub mod map;

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use meshlogger_common::{MeshLoggerError, CHAT_WINDOW_DAYS, STATS_LINK_WINDOW_DAYS};
use meshlogger_engine::{chat_feed, find_node, snr_report, BandReport, NodeDetail, NodeDirectory};

use crate::AppState;

// --- Query structs ---

#[derive(Deserialize)]
pub struct ActionQuery {
    action: Option<String>,
    query: Option<String>,
}

// --- Helpers ---

pub(crate) fn success<T: Serialize>(data: T) -> Response {
    Json(serde_json::json!({
        "status": "success",
        "data": data,
    }))
    .into_response()
}

pub(crate) fn error_response(err: MeshLoggerError) -> Response {
    let (status, message) = match &err {
        MeshLoggerError::InvalidParameter(m) => (StatusCode::BAD_REQUEST, m.clone()),
        MeshLoggerError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
        MeshLoggerError::DataUnavailable(_) => {
            warn!(error = %err, "Node database unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, "Node data is unavailable.".to_string())
        }
        MeshLoggerError::Config(_) | MeshLoggerError::Anyhow(_) => {
            warn!(error = %err, "Request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error.".to_string())
        }
    };

    (
        status,
        Json(serde_json::json!({
            "status": "error",
            "message": message,
        })),
    )
        .into_response()
}

/// Malformed query strings get the same envelope as any other bad parameter.
pub(crate) fn query_params<T>(
    params: Result<Query<T>, QueryRejection>,
) -> Result<T, MeshLoggerError> {
    params
        .map(|Query(inner)| inner)
        .map_err(|rejection| MeshLoggerError::InvalidParameter(rejection.body_text()))
}

// --- Handlers ---

/// `GET /api?action=globalstats|nodeinfo|snrinfo&query=...`
pub async fn api_action(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ActionQuery>, QueryRejection>,
) -> impl IntoResponse {
    action(&state, params).await.unwrap_or_else(error_response)
}

async fn action(
    state: &AppState,
    params: Result<Query<ActionQuery>, QueryRejection>,
) -> Result<Response, MeshLoggerError> {
    let params = query_params(params)?;
    let query = params.query.unwrap_or_default();
    match params.action.as_deref() {
        Some("globalstats") => global_stats(state, &query).await,
        Some("nodeinfo") => node_info(state, &query).await,
        Some("snrinfo") => snr_info(state, &query).await,
        _ => Err(MeshLoggerError::InvalidParameter(
            "Invalid action specified.".to_string(),
        )),
    }
}

async fn global_stats(state: &AppState, query: &str) -> Result<Response, MeshLoggerError> {
    let band = state.aggregator.resolve_band(query)?;
    let now = Utc::now();
    let snapshot = state
        .source
        .load_snapshot(
            Some(band),
            Some(now - Duration::days(STATS_LINK_WINDOW_DAYS)),
            None,
        )
        .await?;

    let report = state.aggregator.aggregate(&snapshot, band.mhz(), now)?;
    let body = match &report {
        BandReport::Summary { .. } => serde_json::json!({
            "status": "success",
            "frequency": band,
            "data": report,
        }),
        BandReport::NoData { .. } => serde_json::json!({
            "status": "success",
            "frequency": band,
            "message": format!("No node data to analyze for {band} MHz."),
            "data": report,
        }),
    };
    Ok(Json(body).into_response())
}

async fn node_info(state: &AppState, query: &str) -> Result<Response, MeshLoggerError> {
    let snapshot = state.source.load_snapshot(None, None, None).await?;
    let node = find_node(&snapshot.nodes, query)?;
    Ok(success(NodeDetail::from_node(node)))
}

async fn snr_info(state: &AppState, query: &str) -> Result<Response, MeshLoggerError> {
    let now = Utc::now();
    let snapshot = state
        .source
        .load_snapshot(None, Some(now - Duration::days(STATS_LINK_WINDOW_DAYS)), None)
        .await?;
    let node = find_node(&snapshot.nodes, query)?;
    let directory = NodeDirectory::new(&snapshot.nodes);
    Ok(success(snr_report(node.node_id, &snapshot.links, &directory, now)))
}

/// `GET /api/chat`
pub async fn api_chat(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let now = Utc::now();
    match state
        .source
        .load_snapshot(None, None, Some(now - Duration::days(CHAT_WINDOW_DAYS)))
        .await
    {
        Ok(snapshot) => {
            let directory = NodeDirectory::new(&snapshot.nodes);
            success(chat_feed(&snapshot.chat, &directory, now))
        }
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use meshlogger_common::{
        ActivitySample, Band, ChatMessage, HourlyCounts, LinkSample, Node, Snapshot,
    };
    use meshlogger_store::{MemorySnapshotSource, SnapshotSource};
    use tower::ServiceExt;

    pub(crate) fn mesh() -> MemorySnapshotSource {
        let now = Utc::now();
        let nodes = vec![
            Node {
                short_name: Some("A".into()),
                long_name: Some("Alpha".into()),
                freq: 433,
                battery_level: 80,
                uptime: 3_661,
                last_updated: Some(now),
                latitude: 474_979_000,
                longitude: 190_402_000,
                counts: HourlyCounts {
                    message: 10,
                    sum: 60,
                    ..HourlyCounts::default()
                },
                ..Node::new(0xa1)
            },
            Node {
                short_name: Some("B".into()),
                long_name: Some("Bravo".into()),
                freq: 433,
                last_updated: Some(now - Duration::seconds(90_000)),
                latitude: 475_500_000,
                longitude: 191_000_000,
                counts: HourlyCounts {
                    message: 50,
                    sum: 200,
                    ..HourlyCounts::default()
                },
                ..Node::new(0xb2)
            },
        ];

        let mut forward = LinkSample::new(0xa1, 0xb2, -3.0);
        forward.last_updated = Some(now - Duration::hours(1));
        let mut reverse = LinkSample::new(0xb2, 0xa1, 4.5);
        reverse.last_updated = Some(now - Duration::hours(2));

        MemorySnapshotSource::new()
            .with_nodes(nodes)
            .with_links(vec![forward, reverse])
            .with_chat(vec![ChatMessage {
                node_id: 0xa1,
                message: "hello mesh".into(),
                timestamp: Some(now - Duration::minutes(5)),
                freq: 433,
            }])
            .with_activity(
                Band::Mhz433,
                vec![ActivitySample {
                    time_utc: now,
                    all_packets: 120,
                    decoded: 100,
                    handled: 90,
                }],
            )
    }

    pub(crate) fn app_with(source: impl SnapshotSource + 'static) -> axum::Router {
        crate::router(Arc::new(AppState {
            source: Arc::new(source),
            aggregator: meshlogger_engine::Aggregator::new(Band::ALL.to_vec()),
        }))
    }

    pub(crate) async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    struct DownSource;

    #[async_trait::async_trait]
    impl SnapshotSource for DownSource {
        async fn load_snapshot(
            &self,
            _band_activity: Option<Band>,
            _link_since: Option<chrono::DateTime<Utc>>,
            _chat_since: Option<chrono::DateTime<Utc>>,
        ) -> Result<Snapshot, MeshLoggerError> {
            Err(MeshLoggerError::DataUnavailable("unable to open database file".into()))
        }
    }

    #[tokio::test]
    async fn health_check_is_ok_and_uncached() {
        let response = app_with(mesh())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["cache-control"], "no-store");
        assert_eq!(response.headers()["pragma"], "no-cache");
    }

    #[tokio::test]
    async fn global_stats_for_band() {
        let (status, body) = get(app_with(mesh()), "/api?action=globalstats&query=433").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["frequency"], 433);
        assert_eq!(body["data"]["node_status"]["online_nodes"], 1);
        assert_eq!(body["data"]["node_status"]["stale_nodes"], 1);
        assert_eq!(body["data"]["top_contributors_online"]["text_msgs"]["node"], "A");
        assert_eq!(body["data"]["link_stats_snr_7_days"]["total_links_logged"], 2);
        assert_eq!(body["data"]["averages_online_nodes"]["uptime_human"], "1h 1m");
    }

    #[tokio::test]
    async fn global_stats_empty_band() {
        let (status, body) = get(app_with(mesh()), "/api?action=globalstats&query=868").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "No node data to analyze for 868 MHz.");
        assert!(body["data"]["recent_activity"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn global_stats_rejects_unknown_band() {
        let (status, body) = get(app_with(mesh()), "/api?action=globalstats&query=915").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert_eq!(
            body["message"],
            "Invalid query parameter. Must be \"433\" or \"868\"."
        );
    }

    #[tokio::test]
    async fn unknown_action_is_rejected() {
        let (status, body) = get(app_with(mesh()), "/api?action=reboot").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid action specified.");

        let (status, _) = get(app_with(mesh()), "/api").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn node_info_by_short_name_and_hex() {
        let (status, body) = get(app_with(mesh()), "/api?action=nodeinfo&query=b").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["node_id_hex"], "!000000b2");
        assert_eq!(body["data"]["long_name"], "Bravo");

        let (_, body) = get(app_with(mesh()), "/api?action=nodeinfo&query=!000000A1").await;
        assert_eq!(body["data"]["short_name"], "A");
        assert_eq!(body["data"]["counts_per_hour"]["total"], 60);
    }

    #[tokio::test]
    async fn node_info_errors() {
        let (status, body) = get(app_with(mesh()), "/api?action=nodeinfo&query=zzz").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Node not found with identifier: zzz");

        let (status, _) = get(app_with(mesh()), "/api?action=nodeinfo").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn repeated_query_parameter_is_an_error_envelope() {
        let (status, body) = get(app_with(mesh()), "/api?action=nodeinfo&query=A&query=B").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert!(body["message"].as_str().unwrap().contains("query"));
    }

    #[tokio::test]
    async fn snr_info_lists_both_directions() {
        let (status, body) = get(app_with(mesh()), "/api?action=snrinfo&query=A").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["incoming"][0]["from_node_name"], "B");
        assert_eq!(body["data"]["incoming"][0]["snr"], 4.5);
        assert_eq!(body["data"]["outgoing"][0]["to_node_id"], 0xb2);
        assert_eq!(body["data"]["outgoing"][0]["snr"], -3.0);
    }

    #[tokio::test]
    async fn chat_feed_names_senders() {
        let (status, body) = get(app_with(mesh()), "/api/chat").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["sender"], "A");
        assert_eq!(body["data"][0]["message"], "hello mesh");
        assert_eq!(body["data"][0]["has_coords"], true);
    }

    #[tokio::test]
    async fn unavailable_database_is_503() {
        let (status, body) = get(app_with(DownSource), "/api?action=globalstats&query=433").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "error");

        let (status, _) = get(app_with(DownSource), "/api/chat").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
