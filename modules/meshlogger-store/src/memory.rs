use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use meshlogger_common::{
    ActivitySample, Band, ChatMessage, LinkSample, MeshLoggerError, Node, Snapshot,
    RECENT_ACTIVITY_LIMIT,
};

use crate::source::SnapshotSource;

/// In-memory snapshot source for tests and demos.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotSource {
    pub nodes: Vec<Node>,
    pub links: Vec<LinkSample>,
    pub chat: Vec<ChatMessage>,
    pub activity: HashMap<Band, Vec<ActivitySample>>,
}

impl MemorySnapshotSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nodes(mut self, nodes: Vec<Node>) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn with_links(mut self, links: Vec<LinkSample>) -> Self {
        self.links = links;
        self
    }

    pub fn with_chat(mut self, chat: Vec<ChatMessage>) -> Self {
        self.chat = chat;
        self
    }

    pub fn with_activity(mut self, band: Band, samples: Vec<ActivitySample>) -> Self {
        self.activity.insert(band, samples);
        self
    }
}

#[async_trait]
impl SnapshotSource for MemorySnapshotSource {
    async fn load_snapshot(
        &self,
        band_activity: Option<Band>,
        link_since: Option<DateTime<Utc>>,
        chat_since: Option<DateTime<Utc>>,
    ) -> Result<Snapshot, MeshLoggerError> {
        let links = match link_since {
            Some(since) => self
                .links
                .iter()
                .filter(|l| l.is_newer_than(since))
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        let chat = match chat_since {
            Some(since) => self
                .chat
                .iter()
                .filter(|m| m.timestamp.is_some_and(|t| t >= since))
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        let recent_activity = match band_activity.and_then(|band| self.activity.get(&band)) {
            Some(samples) => {
                let mut samples = samples.clone();
                samples.sort_by(|a, b| b.time_utc.cmp(&a.time_utc));
                samples.truncate(RECENT_ACTIVITY_LIMIT);
                samples
            }
            None => Vec::new(),
        };

        Ok(Snapshot {
            nodes: self.nodes.clone(),
            links,
            recent_activity,
            chat,
        })
    }
}
