//! Upload-path error types.

use thiserror::Error;

pub type UploadResult<T> = Result<T, UploadError>;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("youtube credentials not configured for channel {0}")]
    CredentialResolution(String),

    #[error("failed to initialize upload client: {0}")]
    ClientInit(String),

    #[error("upload request failed: {0}")]
    UploadFailed(String),

    #[error("source file not found: {0}")]
    SourceNotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}
