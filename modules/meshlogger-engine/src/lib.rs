pub mod aggregate;
pub mod chat;
pub mod color;
pub mod freshness;
pub mod geometry;
pub mod identity;
pub mod links;
pub mod map_nodes;
pub mod node_report;
pub mod summary;

pub use aggregate::{Aggregator, Metric};
pub use chat::{chat_feed, ChatEntry};
pub use color::{snr_color, Rgb};
pub use freshness::{is_stale, time_ago};
pub use geometry::{
    build_edges, curve_controls, Edge, EdgeFilter, EdgeShape, NodePositions, Projection,
    ScreenPoint, WebMercator,
};
pub use identity::{display_name, find_node, hex_id, NodeDirectory};
pub use links::{dedup_links, LogicalLink};
pub use map_nodes::{map_nodes, MapNode, NodeSort};
pub use node_report::{snr_report, NodeDetail, SnrReport};
pub use summary::{format_uptime, BandReport, BandSummary};
