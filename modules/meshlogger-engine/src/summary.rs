//! Band statistics report shapes. Field names are the public JSON contract.

use meshlogger_common::{ActivitySample, Band};
use serde::Serialize;

/// Result of aggregating one band: either a full summary or the empty-band state.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum BandReport {
    Summary {
        #[serde(skip)]
        band: Band,
        #[serde(flatten)]
        summary: Box<BandSummary>,
    },
    NoData {
        #[serde(skip)]
        band: Band,
        recent_activity: Vec<ActivitySample>,
    },
}

impl BandReport {
    pub fn band(&self) -> Band {
        match self {
            BandReport::Summary { band, .. } | BandReport::NoData { band, .. } => *band,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, BandReport::NoData { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BandSummary {
    pub recent_activity: Vec<ActivitySample>,
    pub node_status: NodeStatus,
    pub message_counts_per_hour: MessageCounts,
    pub top_contributors_online: TopContributors,
    pub link_stats_snr_7_days: LinkStats,
    pub averages_online_nodes: OnlineAverages,
    pub distribution_by_role: Vec<RoleShare>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NodeStatus {
    pub total_nodes: usize,
    pub online_nodes: usize,
    pub stale_nodes: usize,
    pub nodes_with_gps: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageCounts {
    pub total_all_msgs: f64,
    pub total_all_msgs_per_second: f64,
    /// How many times the average packet is heard across the mesh.
    pub avg_repeat_count: f64,
    pub text_msgs: i64,
    pub traceroute: i64,
    pub telemetry: i64,
    pub nodeinfo: i64,
    pub position: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TopCount {
    pub node: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TopPercent {
    pub node: String,
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopContributors {
    pub text_msgs: TopCount,
    pub traceroute: TopCount,
    pub telemetry: TopCount,
    pub nodeinfo: TopCount,
    pub position: TopCount,
    pub channel_utilization: TopPercent,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct BucketShare {
    pub count: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnrDistribution {
    #[serde(rename = "good_gt_0db")]
    pub good: BucketShare,
    #[serde(rename = "okay_0_to_-5db")]
    pub okay: BucketShare,
    #[serde(rename = "weak_-5_to_-10db")]
    pub weak: BucketShare,
    #[serde(rename = "bad_lt_-10db")]
    pub bad: BucketShare,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkStats {
    pub total_links_logged: usize,
    pub average_snr_db: f64,
    pub best_link_db: f64,
    pub best_link_nodes: String,
    pub worst_link_db: f64,
    pub worst_link_nodes: String,
    pub distribution: SnrDistribution,
}

#[derive(Debug, Clone, Serialize)]
pub struct OnlineAverages {
    pub battery_percent: f64,
    pub battery_node_count: usize,
    pub uptime_human: String,
    pub uptime_node_count: usize,
    pub channel_utilization_percent: f64,
    pub channel_utilization_node_count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RoleShare {
    pub role: String,
    pub count: usize,
    pub percentage: f64,
}

/// Round for presentation only; never feed the result back into arithmetic.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// `part / whole * 100`, or 0 when `whole` is 0.
pub fn percent_of(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Human uptime: "Xd Yh", "Xh Ym", "Xm" or "Xs"; "N/A" when not positive.
pub fn format_uptime(total_seconds: f64) -> String {
    if !(total_seconds > 0.0) {
        return "N/A".to_string();
    }
    let total = total_seconds.floor() as i64;
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;

    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m")
    } else {
        format!("{total}s")
    }
}
