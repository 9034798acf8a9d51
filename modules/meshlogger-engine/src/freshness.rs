//! Stale-node classification and "last seen" formatting.

use chrono::{DateTime, Utc};
use meshlogger_common::STALE_AFTER_SECS;

/// A node is stale when its last telemetry is more than `STALE_AFTER_SECS` before `now`.
///
/// A node that has never reported is *not* stale: there is no evidence either way.
pub fn is_stale(last_updated: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match last_updated {
        Some(seen) => (now - seen).num_seconds() > STALE_AFTER_SECS,
        None => false,
    }
}

/// Short relative age for node lists and popups.
pub fn time_ago(last_updated: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(seen) = last_updated else {
        return "Never".to_string();
    };

    let diff_seconds = (now - seen).num_milliseconds() as f64 / 1000.0;
    let diff_seconds = diff_seconds.round();
    if diff_seconds < 0.0 {
        return "in the future".to_string();
    }
    if diff_seconds < 60.0 {
        return format!("{diff_seconds} sec");
    }

    let diff_minutes = (diff_seconds / 60.0).round();
    if diff_minutes < 60.0 {
        return format!("{diff_minutes} min");
    }

    let diff_hours = (diff_minutes / 60.0).round();
    if diff_hours < 24.0 {
        return format!("{diff_hours} hours");
    }

    let diff_days = (diff_hours / 24.0).round();
    format!("{diff_days} days")
}
