use async_trait::async_trait;
use chrono::{DateTime, Utc};
use meshlogger_common::{
    parse_timestamp, ActivitySample, Band, ChatMessage, HourlyCounts, LinkSample,
    MeshLoggerError, Node, NodeId, Role, Snapshot, RECENT_ACTIVITY_LIMIT,
};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info, warn};

use crate::source::SnapshotSource;

const MAX_CONNECTIONS: u32 = 4;

/// Reads the SQLite database the mesh logger writes.
#[derive(Clone)]
pub struct SqliteSnapshotStore {
    pool: SqlitePool,
}

fn unavailable(err: sqlx::Error) -> MeshLoggerError {
    MeshLoggerError::DataUnavailable(err.to_string())
}

/// SQLite stores ids as signed 64-bit. Keep the low 32 bits, so `-1` becomes `u32::MAX`.
fn node_id(raw: i64) -> NodeId {
    raw as NodeId
}

/// SQLite's `CURRENT_TIMESTAMP` text, the form its string comparison orders correctly.
fn sql_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn timestamp(row: &SqliteRow, column: &str) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    let raw: Option<String> = row.try_get(column)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

const NODES_SQL: &str = r#"
    SELECT CAST(node_id AS INTEGER) AS node_id,
           short_name, long_name,
           CAST(COALESCE(latitude, 0) AS INTEGER) AS latitude,
           CAST(COALESCE(longitude, 0) AS INTEGER) AS longitude,
           CAST(last_updated AS TEXT) AS last_updated,
           CAST(COALESCE(battery_level, 0) AS INTEGER) AS battery_level,
           CAST(COALESCE(battery_voltage, 0) AS REAL) AS battery_voltage,
           CAST(COALESCE(temperature, 0) AS REAL) AS temperature,
           CAST(COALESCE(uptime, 0) AS INTEGER) AS uptime,
           CAST(COALESCE(chutil, 0) AS REAL) AS chutil,
           CAST(COALESCE(freq, 0) AS INTEGER) AS freq,
           CAST(COALESCE(role, 0) AS INTEGER) AS role,
           CAST(COALESCE(lastchn, 0) AS INTEGER) AS lastchn,
           CAST(COALESCE(msgcntph, 0) AS INTEGER) AS msgcntph,
           CAST(COALESCE(tracecntph, 0) AS INTEGER) AS tracecntph,
           CAST(COALESCE(telemetrycntph, 0) AS INTEGER) AS telemetrycntph,
           CAST(COALESCE(nodeinfocntph, 0) AS INTEGER) AS nodeinfocntph,
           CAST(COALESCE(poscntph, 0) AS INTEGER) AS poscntph,
           CAST(COALESCE(sumcntph, 0) AS INTEGER) AS sumcntph
    FROM nodes
"#;

const LINKS_SQL: &str = r#"
    SELECT CAST(node1 AS INTEGER) AS node1,
           CAST(node2 AS INTEGER) AS node2,
           CAST(COALESCE(snr, 0) AS REAL) AS snr,
           CAST(last_updated AS TEXT) AS last_updated
    FROM snr
    WHERE last_updated >= ?1
"#;

const CHAT_SQL: &str = r#"
    SELECT CAST(node_id AS INTEGER) AS node_id,
           COALESCE(message, '') AS message,
           CAST(timestamp AS TEXT) AS timestamp,
           CAST(COALESCE(freq, 0) AS INTEGER) AS freq
    FROM chat
    WHERE timestamp >= ?1
    ORDER BY timestamp DESC
"#;

/// Each band has its own counter columns in `mainstats`.
fn activity_sql(band: Band) -> &'static str {
    match band {
        Band::Mhz433 => {
            r#"
            SELECT CAST(time AS TEXT) AS time,
                   CAST(COALESCE(allcnt_433, 0) AS INTEGER) AS all_packets,
                   CAST(COALESCE(decoded_433, 0) AS INTEGER) AS decoded,
                   CAST(COALESCE(handled_433, 0) AS INTEGER) AS handled
            FROM mainstats
            ORDER BY time DESC
            LIMIT ?1
            "#
        }
        Band::Mhz868 => {
            r#"
            SELECT CAST(time AS TEXT) AS time,
                   CAST(COALESCE(allcnt_868, 0) AS INTEGER) AS all_packets,
                   CAST(COALESCE(decoded_868, 0) AS INTEGER) AS decoded,
                   CAST(COALESCE(handled_868, 0) AS INTEGER) AS handled
            FROM mainstats
            ORDER BY time DESC
            LIMIT ?1
            "#
        }
    }
}

impl SqliteSnapshotStore {
    pub async fn connect(url: &str) -> Result<Self, MeshLoggerError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(url)
            .await
            .map_err(unavailable)?;
        info!(url, "Connected to node database");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn nodes(&self) -> Result<Vec<Node>, MeshLoggerError> {
        let rows = sqlx::query(NODES_SQL)
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;
        rows.iter().map(row_to_node).collect::<Result<_, _>>().map_err(unavailable)
    }

    pub async fn links_since(&self, since: DateTime<Utc>) -> Result<Vec<LinkSample>, MeshLoggerError> {
        let rows = sqlx::query(LINKS_SQL)
            .bind(sql_timestamp(since))
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;
        rows.iter().map(row_to_link).collect::<Result<_, _>>().map_err(unavailable)
    }

    pub async fn chat_since(&self, since: DateTime<Utc>) -> Result<Vec<ChatMessage>, MeshLoggerError> {
        let rows = sqlx::query(CHAT_SQL)
            .bind(sql_timestamp(since))
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;
        rows.iter().map(row_to_chat).collect::<Result<_, _>>().map_err(unavailable)
    }

    /// Latest global packet counters for `band`, newest first.
    pub async fn recent_activity(&self, band: Band) -> Result<Vec<ActivitySample>, MeshLoggerError> {
        let rows = sqlx::query(activity_sql(band))
            .bind(RECENT_ACTIVITY_LIMIT as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;

        let mut samples = Vec::with_capacity(rows.len());
        for row in &rows {
            let Some(time_utc) = timestamp(row, "time").map_err(unavailable)? else {
                warn!(band = %band, "Skipping mainstats row with unreadable time");
                continue;
            };
            samples.push(ActivitySample {
                time_utc,
                all_packets: row.try_get("all_packets").map_err(unavailable)?,
                decoded: row.try_get("decoded").map_err(unavailable)?,
                handled: row.try_get("handled").map_err(unavailable)?,
            });
        }
        Ok(samples)
    }
}

#[async_trait]
impl SnapshotSource for SqliteSnapshotStore {
    async fn load_snapshot(
        &self,
        band_activity: Option<Band>,
        link_since: Option<DateTime<Utc>>,
        chat_since: Option<DateTime<Utc>>,
    ) -> Result<Snapshot, MeshLoggerError> {
        let nodes = self.nodes().await?;
        let links = match link_since {
            Some(since) => self.links_since(since).await?,
            None => Vec::new(),
        };
        let chat = match chat_since {
            Some(since) => self.chat_since(since).await?,
            None => Vec::new(),
        };
        let recent_activity = match band_activity {
            Some(band) => self.recent_activity(band).await?,
            None => Vec::new(),
        };

        debug!(
            nodes = nodes.len(),
            links = links.len(),
            chat = chat.len(),
            activity = recent_activity.len(),
            "Loaded snapshot"
        );

        Ok(Snapshot {
            nodes,
            links,
            recent_activity,
            chat,
        })
    }
}

// ---------------------------------------------------------------------------
// Internal
// ---------------------------------------------------------------------------

fn row_to_node(r: &SqliteRow) -> Result<Node, sqlx::Error> {
    Ok(Node {
        node_id: node_id(r.try_get("node_id")?),
        short_name: r.try_get("short_name")?,
        long_name: r.try_get("long_name")?,
        latitude: r.try_get("latitude")?,
        longitude: r.try_get("longitude")?,
        last_updated: timestamp(r, "last_updated")?,
        battery_level: r.try_get("battery_level")?,
        battery_voltage: r.try_get("battery_voltage")?,
        temperature: r.try_get("temperature")?,
        uptime: r.try_get("uptime")?,
        chutil: r.try_get("chutil")?,
        freq: r.try_get::<i64, _>("freq")? as u32,
        role: Role(r.try_get("role")?),
        last_channel: r.try_get("lastchn")?,
        counts: HourlyCounts {
            message: r.try_get("msgcntph")?,
            traceroute: r.try_get("tracecntph")?,
            telemetry: r.try_get("telemetrycntph")?,
            nodeinfo: r.try_get("nodeinfocntph")?,
            position: r.try_get("poscntph")?,
            sum: r.try_get("sumcntph")?,
        },
    })
}

fn row_to_link(r: &SqliteRow) -> Result<LinkSample, sqlx::Error> {
    Ok(LinkSample {
        node1: node_id(r.try_get("node1")?),
        node2: node_id(r.try_get("node2")?),
        snr: r.try_get("snr")?,
        last_updated: timestamp(r, "last_updated")?,
    })
}

fn row_to_chat(r: &SqliteRow) -> Result<ChatMessage, sqlx::Error> {
    Ok(ChatMessage {
        node_id: node_id(r.try_get("node_id")?),
        message: r.try_get("message")?,
        timestamp: timestamp(r, "timestamp")?,
        freq: r.try_get::<i64, _>("freq")? as u32,
    })
}
