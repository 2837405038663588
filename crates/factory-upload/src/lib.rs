//! Upload-client abstraction for the uploader worker role: a mock backend
//! for local pipelines and a real YouTube backend behind the same trait,
//! plus the credential resolution rule that picks between them per channel.

pub mod client;
pub mod credentials;
pub mod error;

pub use client::{MockUploadClient, UploadClient, UploadOutcome, UploadRequest, YouTubeUploadClient};
pub use credentials::{resolve_youtube_channel_credentials, CredentialConfig, CredentialSource, ResolvedCredentials};
pub use error::{UploadError, UploadResult};
