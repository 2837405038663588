use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A planned video: a titled unit of audio + image inputs bound to one
/// channel. `origin_meta_key` is the import-side external identifier
/// (absolute path on local origin, file id on a remote bucket) that makes
/// importation idempotent — at most one release exists per
/// (channel, origin_meta_key).
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Release {
    pub id: i64,
    pub channel_id: i64,
    pub title: String,
    pub description: String,
    pub tags: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub origin_meta_key: String,
    pub created_at: DateTime<Utc>,
}

impl Release {
    /// `tags` is stored as a comma-joined string; callers work with the
    /// ordered list.
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Parsed shape of a release's `meta.json` manifest, before it has been
/// turned into `Asset` and `JobInputLink` rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseMeta {
    pub channel_slug: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub planned_at: Option<String>,
    pub assets: ReleaseMetaAssets,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseMetaAssets {
    pub audio: Vec<String>,
    pub cover: String,
}
