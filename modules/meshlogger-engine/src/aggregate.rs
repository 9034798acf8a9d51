//! Band statistics: activity totals, top talkers, online averages, SNR quality
//! and role mix, computed fresh from one snapshot.
//!
//! Algorithm:
//! 1. Keep nodes whose `freq` is the band; none → `BandReport::NoData`
//! 2. Classify each node as online or stale against `now`
//! 3. Over online nodes: sum hourly counters, average the strictly positive
//!    battery/uptime/channel-utilization readings, track the top node per metric
//! 4. Over all band nodes: role histogram and GPS count
//! 5. Over valid link samples inside the 7-day window whose endpoints are both
//!    band nodes: average, extremes and quality tiers

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use meshlogger_common::{
    ActivitySample, Band, HourlyCounts, LinkSample, MeshLoggerError, Node, NodeId, Role, Snapshot,
    SnrQuality, RECENT_ACTIVITY_LIMIT, STATS_LINK_WINDOW_DAYS,
};
use tracing::debug;

use crate::freshness::is_stale;
use crate::identity::{display_name, NodeDirectory};
use crate::summary::{
    format_uptime, percent_of, round_to, BandReport, BandSummary, BucketShare, LinkStats,
    MessageCounts, NodeStatus, OnlineAverages, RoleShare, SnrDistribution, TopContributors,
    TopCount, TopPercent,
};

const RATE_PLACES: i32 = 2;
const PERCENT_PLACES: i32 = 1;

/// Per-node quantities a "top contributor" is tracked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    TextMessages,
    Traceroute,
    Telemetry,
    NodeInfo,
    Position,
    ChannelUtilization,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::TextMessages,
        Metric::Traceroute,
        Metric::Telemetry,
        Metric::NodeInfo,
        Metric::Position,
        Metric::ChannelUtilization,
    ];

    pub fn value(self, node: &Node) -> f64 {
        match self {
            Metric::TextMessages => node.counts.message as f64,
            Metric::Traceroute => node.counts.traceroute as f64,
            Metric::Telemetry => node.counts.telemetry as f64,
            Metric::NodeInfo => node.counts.nodeinfo as f64,
            Metric::Position => node.counts.position as f64,
            Metric::ChannelUtilization => node.chutil,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Largest value seen so far; equal values never replace the incumbent.
#[derive(Debug, Clone, Default)]
struct TopTracker {
    value: f64,
    node: Option<String>,
}

impl TopTracker {
    fn offer(&mut self, value: f64, node: &Node) {
        if value > self.value {
            self.value = value;
            self.node = Some(display_name(node));
        }
    }

    fn name(&self) -> String {
        self.node.clone().unwrap_or_else(|| "N/A".to_string())
    }

    fn count(&self) -> TopCount {
        TopCount {
            node: self.name(),
            count: self.value as i64,
        }
    }

    fn percent(&self) -> TopPercent {
        TopPercent {
            node: self.name(),
            percent: round_to(self.value, PERCENT_PLACES),
        }
    }
}

/// Sum and count of strictly positive readings.
#[derive(Debug, Clone, Copy, Default)]
struct PositiveMean {
    sum: f64,
    count: usize,
}

impl PositiveMean {
    fn offer(&mut self, value: f64) {
        if value > 0.0 {
            self.sum += value;
            self.count += 1;
        }
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Extreme SNR sample and the directed pair it was measured on.
#[derive(Debug, Clone, Copy)]
struct Extreme {
    snr: f64,
    pair: (NodeId, NodeId),
}

#[derive(Debug, Default)]
struct SnrAccumulator {
    sum: f64,
    count: usize,
    best: Option<Extreme>,
    worst: Option<Extreme>,
    good: usize,
    okay: usize,
    weak: usize,
    bad: usize,
}

impl SnrAccumulator {
    fn offer(&mut self, link: &LinkSample) {
        let snr = link.snr;
        self.sum += snr;
        self.count += 1;

        let sample = Extreme {
            snr,
            pair: (link.node1, link.node2),
        };
        if self.best.map_or(true, |b| snr > b.snr) {
            self.best = Some(sample);
        }
        if self.worst.map_or(true, |w| snr < w.snr) {
            self.worst = Some(sample);
        }

        match SnrQuality::from_snr(snr) {
            SnrQuality::Good => self.good += 1,
            SnrQuality::Okay => self.okay += 1,
            SnrQuality::Weak => self.weak += 1,
            SnrQuality::Bad => self.bad += 1,
        }
    }

    fn share(&self, count: usize) -> BucketShare {
        BucketShare {
            count,
            percent: round_to(percent_of(count, self.count), PERCENT_PLACES),
        }
    }

    fn into_stats(self, directory: &NodeDirectory<'_>) -> LinkStats {
        let average = if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        };
        let describe = |extreme: Option<Extreme>| match extreme {
            Some(e) => (round_to(e.snr, RATE_PLACES), directory.pair_label(e.pair.0, e.pair.1)),
            None => (0.0, "N/A".to_string()),
        };
        let (best_link_db, best_link_nodes) = describe(self.best);
        let (worst_link_db, worst_link_nodes) = describe(self.worst);

        LinkStats {
            total_links_logged: self.count,
            average_snr_db: round_to(average, RATE_PLACES),
            best_link_db,
            best_link_nodes,
            worst_link_db,
            worst_link_nodes,
            distribution: SnrDistribution {
                good: self.share(self.good),
                okay: self.share(self.okay),
                weak: self.share(self.weak),
                bad: self.share(self.bad),
            },
        }
    }
}

/// Computes band statistics for the bands this deployment serves.
#[derive(Debug, Clone)]
pub struct Aggregator {
    bands: Vec<Band>,
}

impl Aggregator {
    pub fn new(bands: Vec<Band>) -> Self {
        Self { bands }
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    fn invalid_band(&self) -> MeshLoggerError {
        let allowed: Vec<String> = self.bands.iter().map(|b| format!("\"{b}\"")).collect();
        MeshLoggerError::InvalidParameter(format!(
            "Invalid query parameter. Must be {}.",
            allowed.join(" or ")
        ))
    }

    /// Map a band in MHz to a served `Band`.
    pub fn band(&self, mhz: u32) -> Result<Band, MeshLoggerError> {
        Band::from_mhz(mhz)
            .filter(|band| self.bands.contains(band))
            .ok_or_else(|| self.invalid_band())
    }

    /// Parse a raw query-string band selector.
    pub fn resolve_band(&self, raw: &str) -> Result<Band, MeshLoggerError> {
        let mhz: u32 = raw.trim().parse().map_err(|_| self.invalid_band())?;
        self.band(mhz)
    }

    pub fn aggregate(
        &self,
        snapshot: &Snapshot,
        band_mhz: u32,
        now: DateTime<Utc>,
    ) -> Result<BandReport, MeshLoggerError> {
        let band = self.band(band_mhz)?;
        let recent_activity = recent_activity(&snapshot.recent_activity);

        let band_nodes: Vec<&Node> = snapshot
            .nodes
            .iter()
            .filter(|node| band.contains(node.freq))
            .collect();

        if band_nodes.is_empty() {
            debug!(band = %band, "No nodes on band");
            return Ok(BandReport::NoData {
                band,
                recent_activity,
            });
        }

        let total_nodes = band_nodes.len();
        let mut online_nodes = 0usize;
        let mut stale_nodes = 0usize;
        let mut nodes_with_gps = 0usize;

        let mut totals = HourlyCounts::default();
        let mut battery = PositiveMean::default();
        let mut uptime = PositiveMean::default();
        let mut chutil = PositiveMean::default();
        let mut top: [TopTracker; 6] = Default::default();

        let mut role_order: Vec<Role> = Vec::new();
        let mut role_counts: HashMap<Role, usize> = HashMap::new();

        for node in &band_nodes {
            if node.has_position() {
                nodes_with_gps += 1;
            }

            if is_stale(node.last_updated, now) {
                stale_nodes += 1;
            } else {
                online_nodes += 1;
                totals.sum += node.counts.sum;
                totals.message += node.counts.message;
                totals.traceroute += node.counts.traceroute;
                totals.telemetry += node.counts.telemetry;
                totals.nodeinfo += node.counts.nodeinfo;
                totals.position += node.counts.position;

                battery.offer(node.battery_level as f64);
                uptime.offer(node.uptime as f64);
                chutil.offer(node.chutil);

                for metric in Metric::ALL {
                    top[metric.index()].offer(metric.value(node), node);
                }
            }

            let count = role_counts.entry(node.role).or_insert(0);
            if *count == 0 {
                role_order.push(node.role);
            }
            *count += 1;
        }

        let total_sum = totals.sum as f64;
        let per_second = total_sum / 3600.0;
        let latest_all_packets = recent_activity.first().map_or(0, |a| a.all_packets);
        let avg_repeat_count = if latest_all_packets > 0 && total_sum > 0.0 {
            latest_all_packets as f64 / total_sum
        } else {
            0.0
        };

        let all_nodes = NodeDirectory::new(&snapshot.nodes);
        let link_stats = link_stats(&snapshot.links, &band_nodes, &all_nodes, now);

        let distribution_by_role = role_order
            .into_iter()
            .map(|role| {
                let count = role_counts[&role];
                RoleShare {
                    role: role.label(),
                    count,
                    percentage: round_to(percent_of(count, total_nodes), PERCENT_PLACES),
                }
            })
            .collect();

        debug!(
            band = %band,
            total_nodes,
            online_nodes,
            stale_nodes,
            links = link_stats.total_links_logged,
            "Aggregated band statistics"
        );

        let summary = BandSummary {
            recent_activity,
            node_status: NodeStatus {
                total_nodes,
                online_nodes,
                stale_nodes,
                nodes_with_gps,
            },
            message_counts_per_hour: MessageCounts {
                total_all_msgs: round_to(total_sum, RATE_PLACES),
                total_all_msgs_per_second: round_to(per_second, RATE_PLACES),
                avg_repeat_count: round_to(avg_repeat_count, RATE_PLACES),
                text_msgs: totals.message,
                traceroute: totals.traceroute,
                telemetry: totals.telemetry,
                nodeinfo: totals.nodeinfo,
                position: totals.position,
            },
            top_contributors_online: TopContributors {
                text_msgs: top[Metric::TextMessages.index()].count(),
                traceroute: top[Metric::Traceroute.index()].count(),
                telemetry: top[Metric::Telemetry.index()].count(),
                nodeinfo: top[Metric::NodeInfo.index()].count(),
                position: top[Metric::Position.index()].count(),
                channel_utilization: top[Metric::ChannelUtilization.index()].percent(),
            },
            link_stats_snr_7_days: link_stats,
            averages_online_nodes: OnlineAverages {
                battery_percent: round_to(battery.mean(), PERCENT_PLACES),
                battery_node_count: battery.count,
                uptime_human: format_uptime(uptime.mean()),
                uptime_node_count: uptime.count,
                channel_utilization_percent: round_to(chutil.mean(), PERCENT_PLACES),
                channel_utilization_node_count: chutil.count,
            },
            distribution_by_role,
        };

        Ok(BandReport::Summary {
            band,
            summary: Box::new(summary),
        })
    }
}

/// Newest first, at most `RECENT_ACTIVITY_LIMIT` rows.
fn recent_activity(samples: &[ActivitySample]) -> Vec<ActivitySample> {
    let mut rows = samples.to_vec();
    rows.sort_by(|a, b| b.time_utc.cmp(&a.time_utc));
    rows.truncate(RECENT_ACTIVITY_LIMIT);
    rows
}

fn link_stats(
    links: &[LinkSample],
    band_nodes: &[&Node],
    directory: &NodeDirectory<'_>,
    now: DateTime<Utc>,
) -> LinkStats {
    let since = now - Duration::days(STATS_LINK_WINDOW_DAYS);
    let members: HashSet<NodeId> = band_nodes.iter().map(|n| n.node_id).collect();

    let mut acc = SnrAccumulator::default();
    for link in links {
        if !link.is_valid() || !link.is_newer_than(since) {
            continue;
        }
        if !members.contains(&link.node1) || !members.contains(&link.node2) {
            continue;
        }
        acc.offer(link);
    }
    acc.into_stats(directory)
}
