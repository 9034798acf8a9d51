//! Display names and identifier lookup for mesh nodes.
//!
//! Every consumer that shows a node to a human (band statistics, edge
//! tooltips, chat senders, SNR reports) goes through `display_name` /
//! `NodeDirectory::display_name` so the fallback chain lives in one place:
//! short name → long name → `!` + 8 hex digits.

use std::collections::HashMap;

use meshlogger_common::{MeshLoggerError, Node, NodeId, NAME_SENTINEL};

/// `!` followed by the node id as 8 lower-case hex digits.
pub fn hex_id(node_id: NodeId) -> String {
    format!("!{node_id:08x}")
}

fn usable(name: Option<&str>) -> Option<&str> {
    name.filter(|n| !n.is_empty() && *n != NAME_SENTINEL)
}

/// Best human-readable name for a known node.
pub fn display_name(node: &Node) -> String {
    usable(node.short_name.as_deref())
        .or_else(|| usable(node.long_name.as_deref()))
        .map(str::to_string)
        .unwrap_or_else(|| hex_id(node.node_id))
}

/// Id-indexed view over the nodes of one snapshot.
pub struct NodeDirectory<'a> {
    by_id: HashMap<NodeId, &'a Node>,
}

impl<'a> NodeDirectory<'a> {
    pub fn new(nodes: &'a [Node]) -> Self {
        let mut by_id = HashMap::with_capacity(nodes.len());
        for node in nodes {
            by_id.entry(node.node_id).or_insert(node);
        }
        Self { by_id }
    }

    pub fn get(&self, node_id: NodeId) -> Option<&'a Node> {
        self.by_id.get(&node_id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Name for any id, including ids with no node row (links often reference those).
    pub fn display_name(&self, node_id: NodeId) -> String {
        match self.get(node_id) {
            Some(node) => display_name(node),
            None => hex_id(node_id),
        }
    }

    /// "A → B" label for a directed pair.
    pub fn pair_label(&self, from: NodeId, to: NodeId) -> String {
        format!("{} → {}", self.display_name(from), self.display_name(to))
    }
}

/// Parse `!aabbccdd`, `AABBCCDD` or a shorter hex form into a node id.
fn parse_hex_query(query: &str) -> Option<NodeId> {
    let digits = query.strip_prefix('!').unwrap_or(query);
    if digits.is_empty() || digits.len() > 8 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    NodeId::from_str_radix(digits, 16).ok()
}

/// Find a node by short name or hex id, both case-insensitive.
///
/// Short names win over ids when a query could be either (`"beef"`).
pub fn find_node<'a>(nodes: &'a [Node], query: &str) -> Result<&'a Node, MeshLoggerError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(MeshLoggerError::InvalidParameter(
            "Missing query parameter (node hex ID or shortname).".to_string(),
        ));
    }

    let by_short_name = nodes.iter().find(|node| {
        usable(node.short_name.as_deref()).is_some_and(|name| name.eq_ignore_ascii_case(query))
    });
    if let Some(node) = by_short_name {
        return Ok(node);
    }

    parse_hex_query(query)
        .and_then(|id| nodes.iter().find(|node| node.node_id == id))
        .ok_or_else(|| MeshLoggerError::NotFound(format!("Node not found with identifier: {query}")))
}
