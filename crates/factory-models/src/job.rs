use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a render/upload job.
///
/// Transitions are owned by the worker role that currently holds the
/// job's lock, with three exceptions: the human-driven transitions out of
/// `WAIT_APPROVAL`/`APPROVED`, a forced `CANCELLED` from the control
/// plane, and the stale-lock reclaimer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Draft,
    WaitingInputs,
    ReadyForRender,
    FetchingInputs,
    Rendering,
    RenderFailed,
    QaRunning,
    QaFailed,
    Uploading,
    UploadFailed,
    WaitApproval,
    Approved,
    Rejected,
    Published,
    Cleaned,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Cancelled | JobState::Rejected | JobState::Published | JobState::Cleaned
        )
    }
}

/// Coarse stage grouping carried by each job, used for retry/backoff
/// configuration and for selecting max-attempt limits. Distinct from
/// `state`, which is the precise lifecycle point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStage {
    Render,
    Upload,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub release_id: i64,
    pub job_type: String,
    pub state: JobState,
    pub stage: JobStage,
    pub priority: i32,
    pub attempt: i32,
    pub locked_by: Option<String>,
    pub locked_at: Option<DateTime<Utc>>,
    pub retry_at: Option<DateTime<Utc>>,
    pub progress_pct: Option<f64>,
    pub progress_text: Option<String>,
    pub error_reason: Option<String>,
    pub approval_notified_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub delete_mp4_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// A lock is eligible for the reclaimer once it has outlived
    /// `lease_ttl_sec`.
    pub fn lock_is_stale(&self, now: DateTime<Utc>, lease_ttl_sec: i64) -> bool {
        match self.locked_at {
            Some(locked_at) => now.signed_duration_since(locked_at).num_seconds() >= lease_ttl_sec,
            None => false,
        }
    }
}
