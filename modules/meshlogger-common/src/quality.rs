use serde::{Deserialize, Serialize};

/// A node with no telemetry for longer than this is stale.
pub const STALE_AFTER_SECS: i64 = 86_400;

/// Link samples older than this are left out of band statistics and node SNR reports.
pub const STATS_LINK_WINDOW_DAYS: i64 = 7;

/// Link samples older than this are not drawn on the map.
pub const MAP_LINK_WINDOW_DAYS: i64 = 14;

/// Chat messages older than this are not shown.
pub const CHAT_WINDOW_DAYS: i64 = 5;

/// Rows of global packet activity reported with band statistics.
pub const RECENT_ACTIVITY_LIMIT: usize = 5;

/// Link quality tier of a single SNR sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnrQuality {
    /// Above 0 dB
    Good,
    /// 0 dB down to -5 dB, inclusive
    Okay,
    /// Below -5 dB down to -10 dB, inclusive
    Weak,
    /// Below -10 dB
    Bad,
}

impl SnrQuality {
    pub fn from_snr(snr: f64) -> Self {
        if snr > 0.0 {
            SnrQuality::Good
        } else if snr >= -5.0 {
            SnrQuality::Okay
        } else if snr >= -10.0 {
            SnrQuality::Weak
        } else {
            SnrQuality::Bad
        }
    }
}
