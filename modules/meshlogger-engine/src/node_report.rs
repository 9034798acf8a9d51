//! Single-node views: the detail card and the per-node SNR lists.

use chrono::{DateTime, Duration, Utc};
use meshlogger_common::{LinkSample, Node, NodeId, STATS_LINK_WINDOW_DAYS};
use serde::Serialize;

use crate::identity::{hex_id, NodeDirectory};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeTelemetry {
    pub battery_level: i64,
    pub battery_voltage: f64,
    pub temperature: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountsPerHour {
    pub total: i64,
    pub message: i64,
    pub traceroute: i64,
    pub telemetry: i64,
    pub nodeinfo: i64,
    pub position: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDetail {
    pub node_id_int: NodeId,
    pub node_id_hex: String,
    pub long_name: Option<String>,
    pub short_name: Option<String>,
    pub position: Position,
    pub last_updated: Option<DateTime<Utc>>,
    pub frequency: u32,
    pub role: String,
    pub lastchn: i64,
    pub uptime_seconds: i64,
    pub telemetry: NodeTelemetry,
    pub counts_per_hour: CountsPerHour,
    pub channel_utilization_percent: f64,
}

impl NodeDetail {
    pub fn from_node(node: &Node) -> Self {
        let position = node.position_degrees();
        Self {
            node_id_int: node.node_id,
            node_id_hex: hex_id(node.node_id),
            long_name: node.long_name.clone(),
            short_name: node.short_name.clone(),
            position: Position {
                latitude: position.lat,
                longitude: position.lon,
            },
            last_updated: node.last_updated,
            frequency: node.freq,
            role: node.role.name().unwrap_or("Unknown").to_string(),
            lastchn: node.last_channel,
            uptime_seconds: node.uptime,
            telemetry: NodeTelemetry {
                battery_level: node.battery_level,
                battery_voltage: node.battery_voltage,
                temperature: node.temperature,
            },
            counts_per_hour: CountsPerHour {
                total: node.counts.sum,
                message: node.counts.message,
                traceroute: node.counts.traceroute,
                telemetry: node.counts.telemetry,
                nodeinfo: node.counts.nodeinfo,
                position: node.counts.position,
            },
            channel_utilization_percent: node.chutil,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncomingSnr {
    pub from_node_id: NodeId,
    pub from_node_name: String,
    pub snr: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingSnr {
    pub to_node_id: NodeId,
    pub to_node_name: String,
    pub snr: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SnrReport {
    pub incoming: Vec<IncomingSnr>,
    pub outgoing: Vec<OutgoingSnr>,
}

/// What `node_id` heard (incoming) and who heard it (outgoing) over the last week.
pub fn snr_report(
    node_id: NodeId,
    links: &[LinkSample],
    directory: &NodeDirectory<'_>,
    now: DateTime<Utc>,
) -> SnrReport {
    let since = now - Duration::days(STATS_LINK_WINDOW_DAYS);
    let mut report = SnrReport::default();

    for sample in links
        .iter()
        .filter(|s| s.is_valid() && s.is_newer_than(since))
    {
        if sample.node2 == node_id {
            report.incoming.push(IncomingSnr {
                from_node_id: sample.node1,
                from_node_name: directory.display_name(sample.node1),
                snr: sample.snr,
            });
        }
        if sample.node1 == node_id {
            report.outgoing.push(OutgoingSnr {
                to_node_id: sample.node2,
                to_node_name: directory.display_name(sample.node2),
                snr: sample.snr,
            });
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use meshlogger_common::{HourlyCounts, Role};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn detail_card_fields() {
        let node = Node {
            short_name: Some("BUD".into()),
            long_name: Some("Budapest Rooftop".into()),
            latitude: 474_979_000,
            longitude: 190_402_000,
            freq: 868,
            role: Role(2),
            uptime: 3_600,
            battery_level: 101,
            last_channel: 8,
            chutil: 12.5,
            counts: HourlyCounts {
                message: 3,
                sum: 40,
                ..HourlyCounts::default()
            },
            ..Node::new(0x0a1b_2c3d)
        };
        let detail = NodeDetail::from_node(&node);
        assert_eq!(detail.node_id_hex, "!0a1b2c3d");
        assert_eq!(detail.role, "Router");
        assert!((detail.position.latitude - 47.4979).abs() < 1e-9);
        assert_eq!(detail.counts_per_hour.total, 40);
        assert_eq!(detail.counts_per_hour.message, 3);
        assert_eq!(detail.frequency, 868);

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["node_id_int"], 0x0a1b_2c3d);
        assert_eq!(json["lastchn"], 8);
        assert_eq!(json["channel_utilization_percent"], 12.5);
    }

    #[test]
    fn unknown_role_reads_unknown() {
        let node = Node {
            role: Role(99),
            ..Node::new(1)
        };
        assert_eq!(NodeDetail::from_node(&node).role, "Unknown");
    }

    #[test]
    fn snr_lists_split_by_direction() {
        let nodes = vec![
            Node {
                short_name: Some("A".into()),
                ..Node::new(1)
            },
            Node {
                short_name: Some("B".into()),
                ..Node::new(2)
            },
        ];
        let directory = NodeDirectory::new(&nodes);

        let mut old = LinkSample::new(2, 1, 7.0);
        old.last_updated = Some(now() - Duration::days(8));
        let links = vec![
            LinkSample::new(2, 1, -4.5),
            LinkSample::new(1, 2, 3.0),
            LinkSample::new(0xbeef, 1, 1.0),
            LinkSample::new(1, 3, 0.0),
            old,
        ];

        let report = snr_report(1, &links, &directory, now());
        assert_eq!(
            report.incoming,
            vec![
                IncomingSnr {
                    from_node_id: 2,
                    from_node_name: "B".into(),
                    snr: -4.5
                },
                IncomingSnr {
                    from_node_id: 0xbeef,
                    from_node_name: "!0000beef".into(),
                    snr: 1.0
                },
            ]
        );
        assert_eq!(
            report.outgoing,
            vec![OutgoingSnr {
                to_node_id: 2,
                to_node_name: "B".into(),
                snr: 3.0
            }]
        );
    }

    #[test]
    fn silent_node_has_empty_lists() {
        let directory = NodeDirectory::new(&[]);
        let report = snr_report(5, &[LinkSample::new(1, 2, 3.0)], &directory, now());
        assert!(report.incoming.is_empty());
        assert!(report.outgoing.is_empty());
    }
}
