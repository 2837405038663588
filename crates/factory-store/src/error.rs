use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("job {0} not found")]
    JobNotFound(i64),

    #[error("channel {0} not found")]
    ChannelNotFound(String),

    #[error("release {0} not found")]
    ReleaseNotFound(i64),

    #[error("malformed JSON column: {0}")]
    MalformedJson(#[from] serde_json::Error),
}
