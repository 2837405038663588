//! Uploader: pushes a QA-passed MP4 to YouTube as a private video (or, for
//! the mock backend, fabricates a local stand-in) and hands the job to
//! human approval.

use std::path::Path;

use chrono::Utc;
use factory_models::{JobInputRole, JobOutputRole, JobState, UploadRecord};
use factory_store::Store;
use factory_upload::{CredentialConfig, MockUploadClient, UploadClient, UploadRequest, YouTubeUploadClient};
use tracing::{info, warn};

use crate::config::{UploadBackend, WorkerConfig};
use crate::error::WorkerResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploaderOutcome {
    Idle,
    Uploaded,
    AlreadyUploaded,
    Retried,
    Terminal,
}

pub async fn run_once(store: &Store, config: &WorkerConfig, worker_id: &str) -> WorkerResult<UploaderOutcome> {
    let Some(job) = store.claim(JobState::Uploading, worker_id, config.job_lock_ttl_sec).await? else {
        return Ok(UploaderOutcome::Idle);
    };
    let job_id = job.id;

    if let Some(existing) = store.get_upload_record(job_id).await? {
        if !existing.video_id.is_empty() {
            store.transition_and_release(job_id, JobState::WaitApproval).await?;
            info!(job_id, "upload already on record, skipping");
            return Ok(UploaderOutcome::AlreadyUploaded);
        }
    }

    let outputs = store.list_output_links(job_id).await?;
    let mp4_link = outputs.iter().find(|o| o.role == JobOutputRole::Mp4);
    let mp4_path = match mp4_link {
        Some(link) => match store.get_asset(link.asset_id).await?.and_then(|a| a.local_path) {
            Some(path) if Path::new(&path).is_file() => path,
            _ => return retry_missing_mp4(store, job_id, config).await,
        },
        None => return retry_missing_mp4(store, job_id, config).await,
    };

    let release = store.get_release(job.release_id).await?;
    let channel = store.get_channel(release.channel_id).await?;

    let request = UploadRequest {
        video_path: mp4_path.into(),
        title: release.title.clone(),
        description: release.description.clone(),
        tags: release.tag_list(),
    };

    let outcome = match config.upload_backend {
        UploadBackend::Mock => MockUploadClient.upload_private(&request).await,
        UploadBackend::Youtube => upload_via_youtube(config, &channel.slug, &request).await,
    };

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(factory_upload::UploadError::CredentialResolution(slug)) => {
            let reason = format!("youtube credentials not configured for channel={slug}");
            return terminal_upload_failure(store, job_id, &reason).await;
        }
        Err(factory_upload::UploadError::ClientInit(reason)) => {
            let reason = format!("youtube client init failed: {reason}");
            return terminal_upload_failure(store, job_id, &reason).await;
        }
        Err(e) => {
            let outcome = store
                .apply_retry_policy(
                    job_id,
                    JobState::Uploading,
                    JobState::UploadFailed,
                    config.max_upload_attempts,
                    config.retry_backoff_sec,
                    &format!("attempt {}: {e}", job.attempt + 1),
                )
                .await?;
            return Ok(retry_outcome_to_cycle(outcome));
        }
    };

    let input_links = store.list_input_links(job_id).await?;
    if let Some(cover_link) = input_links.iter().find(|l| l.role == JobInputRole::Cover) {
        if let Some(asset) = store.get_asset(cover_link.asset_id).await? {
            if let Some(local_path) = &asset.local_path {
                let cover_path = Path::new(&release.origin_meta_key).join(local_path);
                let client: Box<dyn UploadClient> = match config.upload_backend {
                    UploadBackend::Mock => Box::new(MockUploadClient),
                    UploadBackend::Youtube => Box::new(upload_client_for(config, &channel.slug).await?),
                };
                if let Err(e) = client.set_thumbnail(&outcome.video_id, &cover_path).await {
                    warn!(job_id, error = %e, "thumbnail set failed, ignoring");
                }
            }
        }
    }

    let record = UploadRecord {
        id: 0,
        job_id,
        video_id: outcome.video_id,
        view_url: outcome.view_url,
        edit_url: outcome.edit_url,
        privacy: outcome.privacy,
        uploaded_at: Utc::now(),
        error: None,
    };
    store.insert_upload_record(&record).await?;
    store.transition_and_release(job_id, JobState::WaitApproval).await?;
    info!(job_id, video_id = %record.video_id, "upload complete, awaiting approval");
    Ok(UploaderOutcome::Uploaded)
}

async fn upload_via_youtube(
    config: &WorkerConfig,
    channel_slug: &str,
    request: &UploadRequest,
) -> factory_upload::UploadResult<factory_upload::UploadOutcome> {
    let client = upload_client_for(config, channel_slug).await?;
    client.upload_private(request).await
}

async fn upload_client_for(config: &WorkerConfig, channel_slug: &str) -> factory_upload::UploadResult<YouTubeUploadClient> {
    let credential_config = CredentialConfig {
        tokens_base: config.yt_tokens_base.clone(),
        global_client_secret_path: config.yt_global_client_secret.clone(),
        global_token_path: config.yt_global_token.clone(),
    };
    YouTubeUploadClient::resolve(channel_slug, &credential_config).await
}

async fn retry_missing_mp4(store: &Store, job_id: i64, config: &WorkerConfig) -> WorkerResult<UploaderOutcome> {
    let outcome = store
        .apply_retry_policy(
            job_id,
            JobState::Uploading,
            JobState::UploadFailed,
            config.max_upload_attempts,
            config.retry_backoff_sec,
            "missing mp4",
        )
        .await?;
    Ok(retry_outcome_to_cycle(outcome))
}

/// Credential resolution and client-init failures are configuration
/// problems, not transient upload errors: retrying without operator
/// intervention would only burn attempts.
async fn terminal_upload_failure(store: &Store, job_id: i64, reason: &str) -> WorkerResult<UploaderOutcome> {
    store.apply_retry_policy(job_id, JobState::Uploading, JobState::UploadFailed, 0, 0, reason).await?;
    warn!(job_id, reason, "upload failed terminally");
    Ok(UploaderOutcome::Terminal)
}

fn retry_outcome_to_cycle(outcome: factory_store::RetryOutcome) -> UploaderOutcome {
    match outcome {
        factory_store::RetryOutcome::Retried { .. } => UploaderOutcome::Retried,
        factory_store::RetryOutcome::Terminal { .. } => UploaderOutcome::Terminal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factory_store::{create_pool, DbConfig};

    async fn seeded_store_with_uploading_job() -> Store {
        let pool = create_pool(DbConfig::sqlite_memory()).await.unwrap();
        sqlx::query(
            "INSERT INTO render_profiles (name, video_width, video_height, video_fps, video_codec, audio_sample_rate, audio_channels, audio_codec) VALUES ('default', 1920, 1080, 24, 'h264', 48000, 2, 'aac')",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO channels (slug, display_name, render_profile_id, autopublish, created_at) VALUES ('darkwood-reverie', 'Darkwood Reverie', 1, 0, datetime('now'))",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO releases (channel_id, title, description, tags, origin_meta_key, created_at) VALUES (1, 'Episode One', 'd', 'ambient,lofi', 'release-one', datetime('now'))",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO jobs (release_id, job_type, state, stage, priority, attempt, created_at, updated_at) VALUES (1, 'render', 'UPLOADING', 'UPLOAD', 0, 0, datetime('now'), datetime('now'))",
        )
        .execute(&pool)
        .await
        .unwrap();
        Store::new(pool)
    }

    fn test_config(storage_root: &std::path::Path) -> WorkerConfig {
        WorkerConfig {
            storage_root: storage_root.to_path_buf(),
            db_path: storage_root.join("factory.db"),
            renderer_path: std::path::PathBuf::from("/nonexistent/renderer"),
            origin_backend: crate::config::OriginBackend::Local,
            origin_local_root: storage_root.join("origin"),
            upload_backend: UploadBackend::Mock,
            qa_volumedetect_seconds: 10,
            job_lock_ttl_sec: 3600,
            retry_backoff_sec: 60,
            max_render_attempts: 3,
            max_upload_attempts: 3,
            worker_sleep_sec: 1,
            watchdog: crate::config::WatchdogConfig::default(),
            policies_path: None,
            yt_tokens_base: None,
            yt_global_client_secret: None,
            yt_global_token: None,
        }
    }

    #[tokio::test]
    async fn uploads_via_mock_client_and_waits_for_approval() {
        let store = seeded_store_with_uploading_job().await;
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        let mp4_path = dir.path().join("render.mp4");
        tokio::fs::write(&mp4_path, b"fake mp4 bytes").await.unwrap();
        store.register_output(1, 1, factory_models::AssetKind::Mp4, &mp4_path.to_string_lossy(), JobOutputRole::Mp4).await.unwrap();

        let outcome = run_once(&store, &config, "worker-1").await.unwrap();
        assert_eq!(outcome, UploaderOutcome::Uploaded);

        let job = store.get_job(1).await.unwrap();
        assert_eq!(job.state, JobState::WaitApproval);

        let record = store.get_upload_record(1).await.unwrap().unwrap();
        assert!(record.video_id.starts_with("mock-"));
    }

    #[tokio::test]
    async fn already_uploaded_record_is_idempotent() {
        let store = seeded_store_with_uploading_job().await;
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        store
            .insert_upload_record(&UploadRecord {
                id: 0,
                job_id: 1,
                video_id: "mock-existing".to_string(),
                view_url: "file:///tmp/existing".to_string(),
                edit_url: String::new(),
                privacy: "private".to_string(),
                uploaded_at: Utc::now(),
                error: None,
            })
            .await
            .unwrap();

        let outcome = run_once(&store, &config, "worker-1").await.unwrap();
        assert_eq!(outcome, UploaderOutcome::AlreadyUploaded);

        let job = store.get_job(1).await.unwrap();
        assert_eq!(job.state, JobState::WaitApproval);
    }

    #[tokio::test]
    async fn missing_mp4_retries_without_uploading() {
        let store = seeded_store_with_uploading_job().await;
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        let outcome = run_once(&store, &config, "worker-1").await.unwrap();
        assert_eq!(outcome, UploaderOutcome::Retried);

        let job = store.get_job(1).await.unwrap();
        assert_eq!(job.state, JobState::Uploading);
        assert_eq!(job.attempt, 1);
    }
}
