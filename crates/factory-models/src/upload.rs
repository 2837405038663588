use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upload record, keyed by job. An upload record exists iff the job ever
/// entered `WAIT_APPROVAL`; a non-empty `video_id` present before the
/// uploader cycle runs is the idempotency check.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct UploadRecord {
    pub id: i64,
    pub job_id: i64,
    pub video_id: String,
    pub view_url: String,
    pub edit_url: String,
    pub privacy: String,
    pub uploaded_at: DateTime<Utc>,
    pub error: Option<String>,
}
