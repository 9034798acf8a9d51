use async_trait::async_trait;
use chrono::{DateTime, Utc};
use meshlogger_common::{Band, MeshLoggerError, Snapshot};

/// Read-only access to the logger's tables, one consistent fetch per request.
///
/// Each argument selects an optional part of the snapshot; `None` leaves that
/// part empty. Nodes are always loaded.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn load_snapshot(
        &self,
        band_activity: Option<Band>,
        link_since: Option<DateTime<Utc>>,
        chat_since: Option<DateTime<Utc>>,
    ) -> Result<Snapshot, MeshLoggerError>;
}
