use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Liveness row a worker upserts every cycle, read by dashboards and the
/// API's `/health` surface.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct WorkerHeartbeat {
    pub worker_id: String,
    pub role: String,
    pub pid: i64,
    pub hostname: String,
    pub last_seen_at: DateTime<Utc>,
    /// Opaque per-role detail bag, stored as a JSON string (e.g. current
    /// job id, cycle outcome).
    pub detail: String,
}
