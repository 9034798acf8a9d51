use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MeshLoggerError;

/// 32-bit mesh node identifier.
pub type NodeId = u32;

/// Sentinel id the logger writes for an endpoint it could not identify (`-1` in storage).
pub const UNKNOWN_NODE_ID: NodeId = u32::MAX;

/// Placeholder stored for names a node never announced.
pub const NAME_SENTINEL: &str = "N/A";

/// Latitude/longitude are stored as integer degrees scaled by this factor.
pub const COORD_SCALE: f64 = 10_000_000.0;

// --- Geo Types ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

// --- Bands ---

/// Radio frequency band a node reports on. Only bands the storage schema
/// carries activity columns for exist here; `Config::bands` picks which are served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum Band {
    Mhz433,
    Mhz868,
}

impl Band {
    pub const ALL: [Band; 2] = [Band::Mhz433, Band::Mhz868];

    pub fn mhz(self) -> u32 {
        match self {
            Band::Mhz433 => 433,
            Band::Mhz868 => 868,
        }
    }

    pub fn from_mhz(mhz: u32) -> Option<Band> {
        Band::ALL.into_iter().find(|b| b.mhz() == mhz)
    }

    /// Does a node reporting `freq` belong to this band?
    pub fn contains(self, freq: u32) -> bool {
        self.mhz() == freq
    }
}

impl From<Band> for u32 {
    fn from(band: Band) -> u32 {
        band.mhz()
    }
}

impl TryFrom<u32> for Band {
    type Error = String;

    fn try_from(mhz: u32) -> Result<Self, Self::Error> {
        Band::from_mhz(mhz).ok_or_else(|| format!("unknown band {mhz}"))
    }
}

impl std::str::FromStr for Band {
    type Err = MeshLoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .ok()
            .and_then(Band::from_mhz)
            .ok_or_else(|| MeshLoggerError::InvalidParameter(format!("unknown band \"{s}\"")))
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mhz())
    }
}

// --- Roles ---

const ROLE_NAMES: [&str; 13] = [
    "Client",
    "Client Mute",
    "Router",
    "Router Client",
    "Repeater",
    "Tracker",
    "Sensor",
    "TAK",
    "Client Hidden",
    "Lost and Found",
    "TAK Tracker",
    "Router Late",
    "Client base",
];

/// Device role as reported by the firmware. Kept as the raw signed column
/// value so newer firmware roles and corrupt rows survive a round trip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(pub i64);

impl Role {
    pub fn name(self) -> Option<&'static str> {
        usize::try_from(self.0)
            .ok()
            .and_then(|index| ROLE_NAMES.get(index))
            .copied()
    }

    /// Name for histograms: unknown ids keep their number visible.
    pub fn label(self) -> String {
        match self.name() {
            Some(name) => name.to_string(),
            None => format!("Unknown ({})", self.0),
        }
    }
}

// --- Node ---

/// Rolling per-hour packet counters the logger keeps for each node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyCounts {
    pub message: i64,
    pub traceroute: i64,
    pub telemetry: i64,
    pub nodeinfo: i64,
    pub position: i64,
    /// Every packet type, including ones without a dedicated counter.
    pub sum: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub node_id: NodeId,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    /// Fixed-point degrees (see `COORD_SCALE`). 0/0 means "no position".
    pub latitude: i64,
    pub longitude: i64,
    pub last_updated: Option<DateTime<Utc>>,
    /// 0 means unknown.
    pub battery_level: i64,
    pub battery_voltage: f64,
    pub temperature: f64,
    /// Seconds.
    pub uptime: i64,
    /// Channel utilization, percent.
    pub chutil: f64,
    pub freq: u32,
    pub role: Role,
    pub last_channel: i64,
    pub counts: HourlyCounts,
}

impl Node {
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            ..Self::default()
        }
    }

    /// The single place the 0/0 sentinel is interpreted.
    pub fn has_position(&self) -> bool {
        self.latitude != 0 || self.longitude != 0
    }

    pub fn position(&self) -> Option<GeoPoint> {
        self.has_position().then(|| self.position_degrees())
    }

    /// Raw position in degrees, sentinel included.
    pub fn position_degrees(&self) -> GeoPoint {
        GeoPoint::new(
            self.latitude as f64 / COORD_SCALE,
            self.longitude as f64 / COORD_SCALE,
        )
    }
}

// --- Link samples ---

/// One directed SNR measurement: `node2` heard `node1` at `snr` dB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSample {
    pub node1: NodeId,
    pub node2: NodeId,
    pub snr: f64,
    pub last_updated: Option<DateTime<Utc>>,
}

impl LinkSample {
    pub fn new(node1: NodeId, node2: NodeId, snr: f64) -> Self {
        Self {
            node1,
            node2,
            snr,
            last_updated: None,
        }
    }

    /// Zero SNR, self-links and unidentified endpoints carry no information.
    pub fn is_valid(&self) -> bool {
        self.snr != 0.0
            && self.node1 != self.node2
            && self.node1 != UNKNOWN_NODE_ID
            && self.node2 != UNKNOWN_NODE_ID
    }

    /// Samples without a timestamp are kept; the store only returns rows it could date.
    pub fn is_newer_than(&self, since: DateTime<Utc>) -> bool {
        self.last_updated.map_or(true, |t| t >= since)
    }
}

// --- Chat ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub node_id: NodeId,
    pub message: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub freq: u32,
}

// --- Packet activity ---

/// One row of the logger's global packet counters for a band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySample {
    pub time_utc: DateTime<Utc>,
    pub all_packets: i64,
    pub decoded: i64,
    pub handled: i64,
}

// --- Snapshot ---

/// Everything the engine needs for one computation, already fetched.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub nodes: Vec<Node>,
    pub links: Vec<LinkSample>,
    /// Most recent first.
    pub recent_activity: Vec<ActivitySample>,
    pub chat: Vec<ChatMessage>,
}

/// Parse the timestamp formats the logger writes (`CURRENT_TIMESTAMP` or RFC 3339), as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
