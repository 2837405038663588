use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user-composed UI draft awaiting preflight validation against the
/// origin, one row per `DRAFT` job. Field names mirror the operator-facing
/// form: a background and optional cover identified by basename+extension,
/// plus a whitespace-separated list of audio id tokens.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct JobDraft {
    pub job_id: i64,
    pub background_name: String,
    pub background_ext: String,
    pub cover_name: Option<String>,
    pub cover_ext: Option<String>,
    pub audio_ids_text: String,
    pub created_at: DateTime<Utc>,
}
