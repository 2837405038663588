//! Worker-cycle error and outcome types.
//!
//! Workers never let an error cross a claim boundary. Each cycle resolves
//! to one of these outcomes and applies it to the store itself; `main.rs`
//! only logs the outcome and sleeps.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("store error: {0}")]
    Store(#[from] factory_store::StoreError),

    #[error("media error: {0}")]
    Media(#[from] factory_media::MediaError),

    #[error("upload error: {0}")]
    Upload(#[from] factory_upload::UploadError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

/// What happened to the claimed job this cycle. Distinct from `WorkerError`:
/// an `Err` here means the cycle itself blew up (store unreachable, bad
/// config) and the job was left untouched; these variants mean the job's
/// row was updated according to policy.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Nothing claimable.
    Idle,
    /// Job advanced to the named next state.
    Advanced { job_id: i64, to_state: String },
    /// Job scheduled for retry.
    Retried { job_id: i64, attempt: i32, reason: String },
    /// Job moved to a terminal failed/cancelled state.
    Terminal { job_id: i64, state: String, reason: String },
}
