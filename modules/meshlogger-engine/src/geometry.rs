//! Render-ready link edges for the map.
//!
//! A one-way link is a straight segment. A link heard in both directions
//! becomes two arcs bowed to opposite sides of the segment so both SNR
//! values stay readable. The bow is measured in screen pixels, so edges must
//! be rebuilt whenever the map zoom changes.

use std::collections::HashMap;
use std::f64::consts::PI;

use chrono::{DateTime, Utc};
use meshlogger_common::{Band, GeoPoint, LinkSample, Node, NodeId};
use serde::Serialize;

use crate::color::{snr_color, Rgb};
use crate::freshness::is_stale;
use crate::identity::NodeDirectory;
use crate::links::dedup_links;

/// Upper bound of the arc bow, in pixels.
const MAX_CURVE_OFFSET_PX: f64 = 20.0;
/// Arc bow as a fraction of the on-screen segment length.
const CURVE_OFFSET_RATIO: f64 = 0.15;

/// Web Mercator cannot represent the poles.
const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_6;
const TILE_SIZE_PX: f64 = 256.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

/// Maps geographic points to screen pixels and back at one view scale.
pub trait Projection {
    fn project(&self, point: GeoPoint) -> ScreenPoint;
    fn unproject(&self, point: ScreenPoint) -> GeoPoint;
}

/// Spherical Mercator pixel space (256 · 2^zoom px world, y down).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WebMercator {
    pub zoom: f64,
}

impl WebMercator {
    pub fn new(zoom: f64) -> Self {
        Self { zoom }
    }

    fn world_size(&self) -> f64 {
        TILE_SIZE_PX * 2f64.powf(self.zoom)
    }
}

impl Projection for WebMercator {
    fn project(&self, point: GeoPoint) -> ScreenPoint {
        let size = self.world_size();
        let lat = point.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
        let y = (PI / 4.0 + lat / 2.0).tan().ln();
        ScreenPoint {
            x: size * (point.lon / 360.0 + 0.5),
            y: size * (0.5 - y / (2.0 * PI)),
        }
    }

    fn unproject(&self, point: ScreenPoint) -> GeoPoint {
        let size = self.world_size();
        let lon = (point.x / size - 0.5) * 360.0;
        let y = (0.5 - point.y / size) * 2.0 * PI;
        let lat = (2.0 * y.exp().atan() - PI / 2.0).to_degrees();
        GeoPoint::new(lat, lon)
    }
}

/// Narrows what the map draws.
#[derive(Debug, Clone, Default)]
pub struct EdgeFilter {
    /// Only nodes on this band get a position.
    pub band: Option<Band>,
    /// Drop stale nodes (and, with them, their links).
    pub hide_stale: bool,
    /// Ignore link samples older than this.
    pub since: Option<DateTime<Utc>>,
}

/// Positions of the nodes that can anchor an edge.
#[derive(Debug, Clone, Default)]
pub struct NodePositions {
    by_id: HashMap<NodeId, GeoPoint>,
}

impl NodePositions {
    /// Nodes without a real position never enter the map.
    pub fn from_nodes(nodes: &[Node], filter: &EdgeFilter, now: DateTime<Utc>) -> Self {
        let mut by_id = HashMap::new();
        for node in nodes {
            if filter.band.is_some_and(|band| !band.contains(node.freq)) {
                continue;
            }
            if filter.hide_stale && is_stale(node.last_updated, now) {
                continue;
            }
            if let Some(position) = node.position() {
                by_id.entry(node.node_id).or_insert(position);
            }
        }
        Self { by_id }
    }

    pub fn get(&self, node_id: NodeId) -> Option<GeoPoint> {
        self.by_id.get(&node_id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeShape {
    Straight,
    Curved,
}

/// One drawable edge for a single directed SNR sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub from_node: NodeId,
    pub to_node: NodeId,
    pub from: GeoPoint,
    pub to: GeoPoint,
    /// Middle vertex of a curved edge (`from → control → to`).
    pub control: Option<GeoPoint>,
    pub shape: EdgeShape,
    pub color: Rgb,
    /// SNR in dB as text.
    pub label: String,
    pub tooltip: String,
}

/// Control points for the two arcs between `a` and `b`: the segment midpoint
/// pushed `min(20px, 15% of length)` to either side, perpendicular to the segment.
pub fn curve_controls(a: GeoPoint, b: GeoPoint, projection: &impl Projection) -> (GeoPoint, GeoPoint) {
    let p1 = projection.project(a);
    let p2 = projection.project(b);

    let dx = p2.x - p1.x;
    let dy = p2.y - p1.y;
    let distance = dx.hypot(dy);
    let offset = MAX_CURVE_OFFSET_PX.min(distance * CURVE_OFFSET_RATIO);

    let angle = dy.atan2(dx);
    let offset_x = offset * angle.sin();
    let offset_y = -offset * angle.cos();

    let mid_x = (p1.x + p2.x) / 2.0;
    let mid_y = (p1.y + p2.y) / 2.0;

    let first = projection.unproject(ScreenPoint {
        x: mid_x + offset_x,
        y: mid_y + offset_y,
    });
    let second = projection.unproject(ScreenPoint {
        x: mid_x - offset_x,
        y: mid_y - offset_y,
    });
    (first, second)
}

fn snr_label(snr: f64) -> String {
    format!("{snr}")
}

fn edge(
    sample: &LinkSample,
    from: GeoPoint,
    to: GeoPoint,
    control: Option<GeoPoint>,
    directory: &NodeDirectory<'_>,
) -> Edge {
    Edge {
        from_node: sample.node1,
        to_node: sample.node2,
        from,
        to,
        control,
        shape: if control.is_some() {
            EdgeShape::Curved
        } else {
            EdgeShape::Straight
        },
        color: snr_color(sample.snr),
        label: snr_label(sample.snr),
        tooltip: directory.pair_label(sample.node1, sample.node2),
    }
}

/// Build the edge list for one view scale.
///
/// Samples that are invalid, older than `filter.since`, or touch a node with
/// no entry in `positions` are skipped before deduplication.
pub fn build_edges(
    links: &[LinkSample],
    positions: &NodePositions,
    directory: &NodeDirectory<'_>,
    filter: &EdgeFilter,
    projection: &impl Projection,
) -> Vec<Edge> {
    let drawable: Vec<&LinkSample> = links
        .iter()
        .filter(|l| l.is_valid())
        .filter(|l| filter.since.map_or(true, |since| l.is_newer_than(since)))
        .filter(|l| positions.get(l.node1).is_some() && positions.get(l.node2).is_some())
        .collect();

    let mut edges = Vec::new();
    for link in dedup_links(&drawable) {
        let (a, b) = link.endpoints();
        let (Some(pos_a), Some(pos_b)) = (positions.get(a), positions.get(b)) else {
            continue;
        };

        match link.reverse {
            None => edges.push(edge(link.forward, pos_a, pos_b, None, directory)),
            Some(reverse) => {
                let (bow_1, bow_2) = curve_controls(pos_a, pos_b, projection);
                edges.push(edge(link.forward, pos_a, pos_b, Some(bow_1), directory));
                edges.push(edge(reverse, pos_b, pos_a, Some(bow_2), directory));
            }
        }
    }
    edges
}
