//! Recent chat traffic, newest first.

use chrono::{DateTime, Duration, Utc};
use meshlogger_common::{ChatMessage, NodeId, CHAT_WINDOW_DAYS};
use serde::Serialize;

use crate::identity::NodeDirectory;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatEntry {
    pub node_id: NodeId,
    pub sender: String,
    pub message: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub freq: u32,
    /// Whether the sender can be located on the map.
    pub has_coords: bool,
}

/// Messages from the last five days. Undated messages are dropped.
pub fn chat_feed(
    messages: &[ChatMessage],
    directory: &NodeDirectory<'_>,
    now: DateTime<Utc>,
) -> Vec<ChatEntry> {
    let since = now - Duration::days(CHAT_WINDOW_DAYS);
    let mut feed: Vec<ChatEntry> = messages
        .iter()
        .filter(|m| m.timestamp.is_some_and(|t| t >= since))
        .map(|m| ChatEntry {
            node_id: m.node_id,
            sender: directory.display_name(m.node_id),
            message: m.message.clone(),
            timestamp: m.timestamp,
            freq: m.freq,
            has_coords: directory.get(m.node_id).is_some_and(|n| n.has_position()),
        })
        .collect();
    // stable: equal timestamps keep storage order
    feed.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    feed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use meshlogger_common::Node;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn said(node_id: NodeId, message: &str, hours_ago: i64) -> ChatMessage {
        ChatMessage {
            node_id,
            message: message.to_string(),
            timestamp: Some(now() - Duration::hours(hours_ago)),
            freq: 433,
        }
    }

    #[test]
    fn newest_first_within_window() {
        let nodes = vec![
            Node {
                short_name: Some("A".into()),
                latitude: 1,
                ..Node::new(1)
            },
            Node {
                long_name: Some("Bravo".into()),
                ..Node::new(2)
            },
        ];
        let directory = NodeDirectory::new(&nodes);
        let messages = vec![
            said(1, "morning", 10),
            said(2, "hello", 1),
            said(7, "who am i", 3),
            said(1, "last week", 24 * 6),
        ];

        let feed = chat_feed(&messages, &directory, now());
        let texts: Vec<&str> = feed.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(texts, vec!["hello", "who am i", "morning"]);

        assert_eq!(feed[0].sender, "Bravo");
        assert!(!feed[0].has_coords);
        assert_eq!(feed[1].sender, "!00000007");
        assert!(!feed[1].has_coords);
        assert_eq!(feed[2].sender, "A");
        assert!(feed[2].has_coords);
    }

    #[test]
    fn undated_messages_are_dropped() {
        let directory = NodeDirectory::new(&[]);
        let mut undated = said(1, "?", 0);
        undated.timestamp = None;
        assert!(chat_feed(&[undated], &directory, now()).is_empty());
    }
}
