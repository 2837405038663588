use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structural catalogue entry for one audio track, written by the
/// track-catalog worker role's own small queue. Deliberately limited to
/// what can be read off the file and its probe — path, duration,
/// discovery time — with no genre/mood classification.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct TrackCatalogEntry {
    pub id: i64,
    pub path: String,
    pub normalized_filename: String,
    pub duration_sec: Option<f64>,
    pub discovered_at: DateTime<Utc>,
}
