//! Upload client abstraction: a mock backend for local/dev pipelines and a
//! real YouTube backend behind the same trait.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::credentials::{resolve_youtube_channel_credentials, CredentialConfig};
use crate::error::{UploadError, UploadResult};

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub video_path: PathBuf,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    pub video_id: String,
    pub view_url: String,
    pub edit_url: String,
    pub privacy: String,
}

#[async_trait]
pub trait UploadClient: Send + Sync {
    async fn upload_private(&self, request: &UploadRequest) -> UploadResult<UploadOutcome>;

    /// Best-effort thumbnail attach. Callers log and ignore failures.
    async fn set_thumbnail(&self, video_id: &str, image_path: &Path) -> UploadResult<()>;
}

/// Uploads nothing; fabricates a deterministic local outcome so the pipeline
/// can exercise the approval/publish states without network access.
pub struct MockUploadClient;

#[async_trait]
impl UploadClient for MockUploadClient {
    async fn upload_private(&self, request: &UploadRequest) -> UploadResult<UploadOutcome> {
        if !request.video_path.is_file() {
            return Err(UploadError::SourceNotFound(request.video_path.display().to_string()));
        }
        let video_id = format!("mock-{}", request.video_path.file_stem().and_then(|s| s.to_str()).unwrap_or("job"));
        let view_url = format!("file://{}", request.video_path.display());
        debug!(%video_id, "mock upload");
        Ok(UploadOutcome {
            view_url,
            edit_url: String::new(),
            privacy: "private".to_string(),
            video_id,
        })
    }

    async fn set_thumbnail(&self, _video_id: &str, _image_path: &Path) -> UploadResult<()> {
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TokenFile {
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecretInner>,
    web: Option<ClientSecretInner>,
}

#[derive(Debug, Deserialize)]
struct ClientSecretInner {
    client_id: String,
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct VideoInsertResponse {
    id: String,
}

/// Private upload to a YouTube channel via the Data API v3, authenticated
/// with a long-lived OAuth refresh token resolved per channel.
pub struct YouTubeUploadClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    refresh_token: String,
}

impl YouTubeUploadClient {
    pub async fn resolve(channel_slug: &str, config: &CredentialConfig) -> UploadResult<Self> {
        let resolved = resolve_youtube_channel_credentials(channel_slug, config)?;
        info!(channel_slug, source = ?resolved.source, "resolved youtube credentials");
        Self::from_paths(&resolved.client_secret_path, &resolved.token_path).await
    }

    async fn from_paths(client_secret_path: &Path, token_path: &Path) -> UploadResult<Self> {
        let token_raw = tokio::fs::read_to_string(token_path)
            .await
            .map_err(|e| UploadError::ClientInit(format!("reading {}: {e}", token_path.display())))?;
        let token: TokenFile = serde_json::from_str(&token_raw)
            .map_err(|e| UploadError::ClientInit(format!("parsing {}: {e}", token_path.display())))?;

        let secret_raw = tokio::fs::read_to_string(client_secret_path)
            .await
            .map_err(|e| UploadError::ClientInit(format!("reading {}: {e}", client_secret_path.display())))?;
        let secret: ClientSecretFile = serde_json::from_str(&secret_raw)
            .map_err(|e| UploadError::ClientInit(format!("parsing {}: {e}", client_secret_path.display())))?;
        let inner = secret
            .installed
            .or(secret.web)
            .ok_or_else(|| UploadError::ClientInit("client secret file has neither installed nor web section".into()))?;

        Ok(Self {
            http: reqwest::Client::new(),
            client_id: inner.client_id,
            client_secret: inner.client_secret,
            refresh_token: token.refresh_token,
        })
    }

    async fn access_token(&self) -> UploadResult<String> {
        let response = self
            .http
            .post("https://oauth2.googleapis.com/token")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", self.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::UploadFailed(format!("token refresh failed: {body}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| UploadError::MalformedResponse(e.to_string()))?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl UploadClient for YouTubeUploadClient {
    async fn upload_private(&self, request: &UploadRequest) -> UploadResult<UploadOutcome> {
        if !request.video_path.is_file() {
            return Err(UploadError::SourceNotFound(request.video_path.display().to_string()));
        }
        let access_token = self.access_token().await?;

        let metadata = serde_json::json!({
            "snippet": {
                "title": request.title,
                "description": request.description,
                "tags": request.tags,
            },
            "status": { "privacyStatus": "private" },
        });

        let video_bytes = tokio::fs::read(&request.video_path).await?;

        let init = self
            .http
            .post("https://www.googleapis.com/upload/youtube/v3/videos")
            .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
            .bearer_auth(&access_token)
            .header("X-Upload-Content-Type", "video/mp4")
            .json(&metadata)
            .send()
            .await?;

        if !init.status().is_success() {
            let body = init.text().await.unwrap_or_default();
            return Err(UploadError::UploadFailed(format!("resumable session init failed: {body}")));
        }

        let upload_url = init
            .headers()
            .get("Location")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| UploadError::MalformedResponse("resumable session missing Location header".into()))?
            .to_string();

        let upload = self
            .http
            .put(&upload_url)
            .header("Content-Type", "video/mp4")
            .body(video_bytes)
            .send()
            .await?;

        if !upload.status().is_success() {
            let body = upload.text().await.unwrap_or_default();
            return Err(UploadError::UploadFailed(format!("video upload failed: {body}")));
        }

        let inserted: VideoInsertResponse = upload
            .json()
            .await
            .map_err(|e| UploadError::MalformedResponse(e.to_string()))?;

        Ok(UploadOutcome {
            view_url: format!("https://www.youtube.com/watch?v={}", inserted.id),
            edit_url: format!("https://studio.youtube.com/video/{}/edit", inserted.id),
            privacy: "private".to_string(),
            video_id: inserted.id,
        })
    }

    async fn set_thumbnail(&self, video_id: &str, image_path: &Path) -> UploadResult<()> {
        let access_token = self.access_token().await?;
        let bytes = match tokio::fs::read(image_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(%video_id, error = %e, "thumbnail read failed, skipping");
                return Ok(());
            }
        };

        let response = self
            .http
            .post("https://www.googleapis.com/upload/youtube/v3/thumbnails/set")
            .query(&[("videoId", video_id)])
            .bearer_auth(&access_token)
            .header("Content-Type", "image/jpeg")
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%video_id, body, "thumbnail upload failed, ignoring");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_upload_requires_existing_file() {
        let client = MockUploadClient;
        let request = UploadRequest {
            video_path: PathBuf::from("/nonexistent/render.mp4"),
            title: "t".into(),
            description: "d".into(),
            tags: vec![],
        };
        let err = client.upload_private(&request).await.unwrap_err();
        assert!(matches!(err, UploadError::SourceNotFound(_)));
    }

    #[tokio::test]
    async fn mock_upload_produces_private_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.mp4");
        tokio::fs::write(&path, b"fake").await.unwrap();

        let client = MockUploadClient;
        let request = UploadRequest {
            video_path: path,
            title: "t".into(),
            description: "d".into(),
            tags: vec!["a".into()],
        };
        let outcome = client.upload_private(&request).await.unwrap();
        assert_eq!(outcome.privacy, "private");
        assert!(outcome.video_id.starts_with("mock-"));
    }
}
