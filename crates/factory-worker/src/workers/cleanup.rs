//! Cleanup: removes leftover per-job workspaces for jobs that are no longer
//! actively rendering, and deletes a published job's MP4/preview once its
//! retention window has elapsed.

use factory_models::JobState;
use factory_store::Store;
use tracing::{info, warn};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::paths;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CleanupSummary {
    pub workspaces_removed: u32,
    pub mp4s_deleted: u32,
}

pub async fn run_once(store: &Store, config: &WorkerConfig) -> WorkerResult<CleanupSummary> {
    let mut summary = CleanupSummary::default();

    let jobs = store.list_jobs(None).await?;
    for job in jobs {
        if matches!(job.state, JobState::FetchingInputs | JobState::Rendering) {
            continue;
        }
        let workspace = paths::workspace_root(&config.storage_root, job.id);
        if workspace.exists() {
            if let Err(e) = tokio::fs::remove_dir_all(&workspace).await {
                warn!(job_id = job.id, error = %e, "failed to remove stale workspace");
            } else {
                summary.workspaces_removed += 1;
            }
        }
    }

    for job in store.jobs_due_for_cleanup().await? {
        let mp4 = paths::render_mp4_path(&config.storage_root, job.id);
        if mp4.is_file() {
            tokio::fs::remove_file(&mp4).await?;
        }
        let preview = paths::preview_path(&config.storage_root, job.id);
        if preview.is_file() {
            tokio::fs::remove_file(&preview).await?;
        }
        // QA reports, logs, and youtube_root links are kept; only the MP4
        // and preview are subject to retention deletion.
        store.mark_cleaned(job.id).await?;
        summary.mp4s_deleted += 1;
        info!(job_id = job.id, "mp4 deleted after retention window");
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use factory_store::{create_pool, DbConfig};

    async fn seeded_store() -> Store {
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
            "INSERT INTO releases (channel_id, title, description, tags, origin_meta_key, created_at) VALUES (1, 'Episode One', 'd', '', 'release-one', datetime('now'))",
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
            upload_backend: crate::config::UploadBackend::Mock,
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
    async fn removes_stale_workspace_for_terminal_job() {
        let store = seeded_store().await;
        sqlx::query(
            "INSERT INTO jobs (release_id, job_type, state, stage, priority, attempt, created_at, updated_at) VALUES (1, 'render', 'QA_FAILED', 'RENDER', 0, 1, datetime('now'), datetime('now'))",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let workspace = paths::workspace_root(&config.storage_root, 1);
        tokio::fs::create_dir_all(&workspace).await.unwrap();

        let summary = run_once(&store, &config).await.unwrap();
        assert_eq!(summary.workspaces_removed, 1);
        assert!(!workspace.exists());
    }

    #[tokio::test]
    async fn leaves_workspace_alone_while_rendering() {
        let store = seeded_store().await;
        sqlx::query(
            "INSERT INTO jobs (release_id, job_type, state, stage, priority, attempt, created_at, updated_at) VALUES (1, 'render', 'RENDERING', 'RENDER', 0, 0, datetime('now'), datetime('now'))",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let workspace = paths::workspace_root(&config.storage_root, 1);
        tokio::fs::create_dir_all(&workspace).await.unwrap();

        let summary = run_once(&store, &config).await.unwrap();
        assert_eq!(summary.workspaces_removed, 0);
        assert!(workspace.exists());
    }

    #[tokio::test]
    async fn deletes_mp4_and_preview_past_retention_window() {
        let store = seeded_store().await;
        sqlx::query(
            "INSERT INTO jobs (release_id, job_type, state, stage, priority, attempt, created_at, updated_at, delete_mp4_at) VALUES (1, 'render', 'PUBLISHED', 'RENDER', 0, 0, datetime('now'), datetime('now'), datetime('now', '-1 hour'))",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let mp4 = paths::render_mp4_path(&config.storage_root, 1);
        let preview = paths::preview_path(&config.storage_root, 1);
        tokio::fs::create_dir_all(mp4.parent().unwrap()).await.unwrap();
        tokio::fs::create_dir_all(preview.parent().unwrap()).await.unwrap();
        tokio::fs::write(&mp4, b"video").await.unwrap();
        tokio::fs::write(&preview, b"preview").await.unwrap();

        let summary = run_once(&store, &config).await.unwrap();
        assert_eq!(summary.mp4s_deleted, 1);
        assert!(!mp4.exists());
        assert!(!preview.exists());

        let job = store.get_job(1).await.unwrap();
        assert_eq!(job.state, JobState::Cleaned);
    }
}
