use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Asset kind: a reference is tagged by kind independent of its role in
/// any particular job (the role — `COVER`/`BACKGROUND`/`TRACK` on input,
/// `MP4`/`PREVIEW_60S` on output — lives on the link table, not here).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetKind {
    Audio,
    Image,
    Mp4,
    Preview60s,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetOrigin {
    Local,
    Gdrive,
}

/// A reference to either a remote object (`origin` + `origin_id`) or a
/// local path, tagged by `kind`. Produced by the Importer (inputs) and the
/// Orchestrator (outputs).
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Asset {
    pub id: i64,
    pub release_id: i64,
    pub kind: AssetKind,
    pub origin: AssetOrigin,
    pub origin_id: Option<String>,
    pub local_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobInputRole {
    Track,
    Background,
    Cover,
}

/// Orders a set of assets into a job under a role label; `order` is only
/// meaningful for `TRACK`.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct JobInputLink {
    pub id: i64,
    pub job_id: i64,
    pub asset_id: i64,
    pub role: JobInputRole,
    pub order: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobOutputRole {
    Mp4,
    Preview60s,
}

/// Registers a produced output file against its job.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct JobOutputLink {
    pub id: i64,
    pub job_id: i64,
    pub asset_id: i64,
    pub role: JobOutputRole,
    pub created_at: DateTime<Utc>,
}
