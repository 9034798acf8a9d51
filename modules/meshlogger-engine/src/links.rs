//! Merge directed SNR samples into one logical link per unordered node pair.

use std::collections::{HashMap, HashSet};

use meshlogger_common::{LinkSample, NodeId};

/// An unordered pair of nodes with the sample measured in each direction.
///
/// `forward` is the first sample seen for the pair and fixes the orientation:
/// `forward.node1 → forward.node2`. `reverse`, when present, goes the other way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogicalLink<'a> {
    pub forward: &'a LinkSample,
    pub reverse: Option<&'a LinkSample>,
}

impl LogicalLink<'_> {
    pub fn is_bidirectional(&self) -> bool {
        self.reverse.is_some()
    }

    pub fn endpoints(&self) -> (NodeId, NodeId) {
        (self.forward.node1, self.forward.node2)
    }
}

fn unordered(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// One `LogicalLink` per unordered pair, in order of each pair's first sample.
///
/// Later samples for an already-seen pair (repeats of either direction) are ignored.
pub fn dedup_links<'a>(samples: &[&'a LinkSample]) -> Vec<LogicalLink<'a>> {
    let mut first_by_direction: HashMap<(NodeId, NodeId), &'a LinkSample> = HashMap::new();
    for sample in samples {
        first_by_direction
            .entry((sample.node1, sample.node2))
            .or_insert(*sample);
    }

    let mut processed: HashSet<(NodeId, NodeId)> = HashSet::new();
    let mut links = Vec::new();
    for sample in samples {
        if !processed.insert(unordered(sample.node1, sample.node2)) {
            continue;
        }
        let reverse = first_by_direction.get(&(sample.node2, sample.node1)).copied();
        links.push(LogicalLink {
            forward: sample,
            reverse,
        });
    }
    links
}
