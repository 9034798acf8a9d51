//! Node list for the map sidebar and markers.

use chrono::{DateTime, Utc};
use meshlogger_common::{Node, NodeId, NAME_SENTINEL};
use serde::{Deserialize, Serialize};

use crate::freshness::{is_stale, time_ago};
use crate::identity::hex_id;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeSort {
    /// Newest first; nodes never heard from go last.
    #[default]
    LastUpdated,
    /// Long name, ascending.
    Name,
}

impl std::str::FromStr for NodeSort {
    type Err = std::convert::Infallible;

    /// Anything but `name` sorts by recency.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "name" => NodeSort::Name,
            _ => NodeSort::LastUpdated,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapNode {
    pub node_id: NodeId,
    pub node_id_hex: String,
    pub short_name: String,
    pub long_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub has_position: bool,
    pub last_updated: Option<DateTime<Utc>>,
    pub last_seen: String,
    pub battery_level: i64,
    pub temperature: f64,
    pub freq: u32,
    pub is_stale: bool,
}

fn name_or_sentinel(name: &Option<String>) -> String {
    match name.as_deref() {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => NAME_SENTINEL.to_string(),
    }
}

pub fn map_nodes(nodes: &[Node], sort: NodeSort, now: DateTime<Utc>) -> Vec<MapNode> {
    let mut ordered: Vec<&Node> = nodes.iter().collect();
    match sort {
        NodeSort::LastUpdated => ordered.sort_by(|a, b| b.last_updated.cmp(&a.last_updated)),
        NodeSort::Name => ordered.sort_by(|a, b| a.long_name.cmp(&b.long_name)),
    }

    ordered
        .into_iter()
        .map(|node| {
            let position = node.position_degrees();
            MapNode {
                node_id: node.node_id,
                node_id_hex: hex_id(node.node_id),
                short_name: name_or_sentinel(&node.short_name),
                long_name: name_or_sentinel(&node.long_name),
                latitude: position.lat,
                longitude: position.lon,
                has_position: node.has_position(),
                last_updated: node.last_updated,
                last_seen: time_ago(node.last_updated, now),
                battery_level: node.battery_level,
                temperature: node.temperature,
                freq: node.freq,
                is_stale: is_stale(node.last_updated, now),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn seen(id: NodeId, long: &str, hours_ago: Option<i64>) -> Node {
        Node {
            long_name: Some(long.to_string()),
            last_updated: hours_ago.map(|h| now() - Duration::hours(h)),
            ..Node::new(id)
        }
    }

    #[test]
    fn default_sort_is_most_recent_first() {
        let nodes = vec![seen(1, "c", Some(30)), seen(2, "a", None), seen(3, "b", Some(1))];
        let ids: Vec<NodeId> = map_nodes(&nodes, NodeSort::LastUpdated, now())
            .iter()
            .map(|n| n.node_id)
            .collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn name_sort_is_alphabetical() {
        let nodes = vec![seen(1, "c", Some(30)), seen(2, "a", None), seen(3, "b", Some(1))];
        let ids: Vec<NodeId> = map_nodes(&nodes, "name".parse().unwrap(), now())
            .iter()
            .map(|n| n.node_id)
            .collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn marker_fields() {
        let nodes = vec![seen(0xab, "far", Some(30)), seen(2, "", Some(2))];
        let list = map_nodes(&nodes, NodeSort::LastUpdated, now());

        assert_eq!(list[0].node_id, 2);
        assert_eq!(list[0].long_name, "N/A");
        assert_eq!(list[0].short_name, "N/A");
        assert_eq!(list[0].last_seen, "2 hours");
        assert!(!list[0].is_stale);
        assert!(!list[0].has_position);

        assert_eq!(list[1].node_id_hex, "!000000ab");
        assert_eq!(list[1].last_seen, "1 days");
        assert!(list[1].is_stale);
    }

    #[test]
    fn unknown_sort_falls_back_to_recency() {
        assert_eq!("bogus".parse::<NodeSort>().unwrap(), NodeSort::LastUpdated);
    }
}
