//! Orchestrator: claims a ready release, stages its inputs into a
//! per-job workspace, spawns the external renderer, and finalizes a
//! QA-ready MP4. The richest worker role.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use factory_media::{GrowthWatchdog, MediaError, PreviewSpec, RenderCommand, RenderRunner};
use factory_models::{AssetKind, JobInputRole, JobOutputRole, JobState};
use factory_store::Store;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::{WatchdogConfig, WorkerConfig};
use crate::error::WorkerResult;
use crate::origin::Origin;
use crate::paths;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorOutcome {
    Idle,
    Rendering,
    Cancelled,
    Retried,
    Terminal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CancelReason {
    ControlPlane,
    Stalled,
}

pub async fn run_once(
    store: &Store,
    origin: &dyn Origin,
    config: &WorkerConfig,
    worker_id: &str,
) -> WorkerResult<OrchestratorOutcome> {
    store
        .reclaim_stale(
            JobState::FetchingInputs,
            JobState::ReadyForRender,
            JobState::RenderFailed,
            config.job_lock_ttl_sec,
            config.max_render_attempts,
            config.retry_backoff_sec,
        )
        .await?;
    store
        .reclaim_stale(
            JobState::Rendering,
            JobState::ReadyForRender,
            JobState::RenderFailed,
            config.job_lock_ttl_sec,
            config.max_render_attempts,
            config.retry_backoff_sec,
        )
        .await?;

    let Some(job) = store.claim(JobState::ReadyForRender, worker_id, config.job_lock_ttl_sec).await? else {
        return Ok(OrchestratorOutcome::Idle);
    };
    let job_id = job.id;

    store.transition_in_place(job_id, JobState::FetchingInputs).await?;

    let release = store.get_release(job.release_id).await?;
    let channel = store.get_channel(release.channel_id).await?;

    let links = store.list_input_links(job_id).await?;
    let tracks: Vec<_> = links.iter().filter(|l| l.role == JobInputRole::Track).collect();
    let backgrounds: Vec<_> = links.iter().filter(|l| l.role == JobInputRole::Background).collect();
    let covers: Vec<_> = links.iter().filter(|l| l.role == JobInputRole::Cover).collect();
    let background = backgrounds.first().or_else(|| covers.first());

    if tracks.is_empty() || background.is_none() {
        let outcome = store
            .apply_retry_policy(
                job_id,
                JobState::ReadyForRender,
                JobState::RenderFailed,
                config.max_render_attempts,
                config.retry_backoff_sec,
                "missing inputs",
            )
            .await?;
        return Ok(retry_outcome_to_cycle(outcome));
    }
    let background = background.unwrap();

    let workspace_root = paths::workspace_root(&config.storage_root, job_id);
    if workspace_root.exists() {
        tokio::fs::remove_dir_all(&workspace_root).await?;
    }
    let youtube_root = paths::youtube_root(&workspace_root, &channel.display_name);
    let audio_dir = paths::audio_dir(&youtube_root);
    let images_dir = paths::images_dir(&youtube_root);
    let release_dir = paths::release_dir(&youtube_root);
    tokio::fs::create_dir_all(&audio_dir).await?;
    tokio::fs::create_dir_all(&images_dir).await?;
    tokio::fs::create_dir_all(&release_dir).await?;

    let mut ordered_tracks = tracks.clone();
    ordered_tracks.sort_by_key(|l| l.order);
    let mut track_labels = Vec::with_capacity(ordered_tracks.len());
    for link in &ordered_tracks {
        let asset = store
            .get_asset(link.asset_id)
            .await?
            .ok_or_else(|| crate::error::WorkerError::Config(format!("asset {} missing", link.asset_id)))?;
        let local_path = asset.local_path.as_deref().unwrap_or_default();
        let src = Path::new(&release.origin_meta_key).join(local_path);
        let label = link.order + 1;
        let title = Path::new(local_path).file_stem().and_then(|s| s.to_str()).unwrap_or("track");
        let filename = paths::ordered_track_filename(label as u32, title);
        origin.stage_file(&src, &audio_dir.join(&filename)).await?;
        track_labels.push(format!("{label:03}"));
    }

    let bg_asset = store
        .get_asset(background.asset_id)
        .await?
        .ok_or_else(|| crate::error::WorkerError::Config(format!("asset {} missing", background.asset_id)))?;
    let bg_local_path = bg_asset.local_path.as_deref().unwrap_or_default();
    let bg_src = Path::new(&release.origin_meta_key).join(bg_local_path);
    let bg_ext = Path::new(bg_local_path).extension().and_then(|s| s.to_str()).unwrap_or("png");
    let bg_stem = Path::new(bg_local_path).file_stem().and_then(|s| s.to_str()).unwrap_or("background");
    let bg_filename = format!("{}.{bg_ext}", paths::sanitize_filename(bg_stem));
    origin.stage_file(&bg_src, &images_dir.join(&bg_filename)).await?;

    let playlist = format!(
        "{}: {}\nImage: {bg_filename}\nStatus: Not done\n",
        release.title,
        track_labels.join(" "),
    );
    tokio::fs::write(paths::playlists_path(&youtube_root), playlist).await?;

    let marker_path = paths::cancel_marker_path(&youtube_root);
    if marker_path.is_file() || store.get_job(job_id).await?.state == JobState::Cancelled {
        store.mark_cancelled(job_id).await?;
        store.release_lock(job_id).await?;
        return Ok(OrchestratorOutcome::Cancelled);
    }

    store.transition_in_place(job_id, JobState::Rendering).await?;

    let cancel_reason = Arc::new(StdMutex::new(None::<CancelReason>));
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let monitor_handle = tokio::spawn(monitor_loop(
        store.clone(),
        job_id,
        marker_path.clone(),
        release_dir.clone(),
        config.watchdog.clone(),
        cancel_tx,
        cancel_reason.clone(),
    ));

    let throttle = Arc::new(StdMutex::new((-1.0_f64, Instant::now())));
    let progress_store = store.clone();
    let progress_callback = move |progress: factory_media::RenderProgress| {
        let mut guard = throttle.lock().unwrap();
        let (last_pct, last_at) = *guard;
        let grew_enough = progress.pct - last_pct >= 0.5;
        let elapsed_enough = last_at.elapsed() >= Duration::from_secs(2);
        if grew_enough || elapsed_enough {
            *guard = (progress.pct, Instant::now());
            let store = progress_store.clone();
            let text = format!("{:.1}%", progress.pct);
            tokio::spawn(async move {
                let _ = store.set_progress(job_id, progress.pct, &text).await;
            });
        }
    };

    let runner = RenderRunner::new().with_cancel(cancel_rx);
    let cmd = RenderCommand::new(&config.renderer_path, &youtube_root);
    let render_result = runner.run_with_progress(&cmd, progress_callback).await;
    monitor_handle.abort();

    match render_result {
        Ok(()) => finalize(store, job_id, &release, &release_dir, config).await,
        Err(MediaError::Cancelled) => match *cancel_reason.lock().unwrap() {
            Some(CancelReason::Stalled) => {
                let outcome = store
                    .apply_retry_policy(
                        job_id,
                        JobState::ReadyForRender,
                        JobState::RenderFailed,
                        config.max_render_attempts,
                        config.retry_backoff_sec,
                        "renderer stalled: no output growth within idle window",
                    )
                    .await?;
                Ok(retry_outcome_to_cycle(outcome))
            }
            _ => {
                store.mark_cancelled(job_id).await?;
                store.release_lock(job_id).await?;
                Ok(OrchestratorOutcome::Cancelled)
            }
        },
        Err(MediaError::FatalImageInvalid(reason)) => {
            warn!(job_id, reason = %reason, "renderer reported fatal image error");
            store
                .apply_retry_policy(job_id, JobState::ReadyForRender, JobState::RenderFailed, 0, 0, &reason)
                .await?;
            Ok(OrchestratorOutcome::Terminal)
        }
        Err(err) => {
            let outcome = store
                .apply_retry_policy(
                    job_id,
                    JobState::ReadyForRender,
                    JobState::RenderFailed,
                    config.max_render_attempts,
                    config.retry_backoff_sec,
                    &format!("attempt {}: {err}", job.attempt + 1),
                )
                .await?;
            Ok(retry_outcome_to_cycle(outcome))
        }
    }
}

async fn finalize(
    store: &Store,
    job_id: i64,
    release: &factory_models::Release,
    release_dir: &Path,
    config: &WorkerConfig,
) -> WorkerResult<OrchestratorOutcome> {
    let newest_mp4 = newest_mp4_under(release_dir).await?;
    let Some(newest_mp4) = newest_mp4 else {
        let outcome = store
            .apply_retry_policy(
                job_id,
                JobState::ReadyForRender,
                JobState::RenderFailed,
                config.max_render_attempts,
                config.retry_backoff_sec,
                "renderer exited cleanly but produced no mp4 under Release/",
            )
            .await?;
        return Ok(retry_outcome_to_cycle(outcome));
    };

    let outbox_mp4 = paths::render_mp4_path(&config.storage_root, job_id);
    if let Some(parent) = outbox_mp4.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::rename(&newest_mp4, &outbox_mp4).await?;

    let preview_path = paths::preview_path(&config.storage_root, job_id);
    if let Some(parent) = preview_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    factory_media::make_preview(&outbox_mp4, &preview_path, PreviewSpec::default()).await?;

    store
        .register_output(job_id, release.id, AssetKind::Mp4, &outbox_mp4.to_string_lossy(), JobOutputRole::Mp4)
        .await?;
    store
        .register_output(
            job_id,
            release.id,
            AssetKind::Preview60s,
            &preview_path.to_string_lossy(),
            JobOutputRole::Preview60s,
        )
        .await?;

    store.transition_and_release(job_id, JobState::QaRunning).await?;
    info!(job_id, "render finalized, handed off to QA gate");
    Ok(OrchestratorOutcome::Rendering)
}

async fn newest_mp4_under(dir: &Path) -> WorkerResult<Option<PathBuf>> {
    let mut newest: Option<(PathBuf, std::time::SystemTime)> = None;
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("mp4") {
            continue;
        }
        let modified = entry.metadata().await?.modified()?;
        if newest.as_ref().map(|(_, t)| modified > *t).unwrap_or(true) {
            newest = Some((path, modified));
        }
    }
    Ok(newest.map(|(path, _)| path))
}

async fn monitor_loop(
    store: Store,
    job_id: i64,
    marker_path: PathBuf,
    release_dir: PathBuf,
    watchdog_cfg: WatchdogConfig,
    cancel_tx: watch::Sender<bool>,
    reason: Arc<StdMutex<Option<CancelReason>>>,
) {
    let mut watchdog = GrowthWatchdog::new(watchdog_cfg.grace_sec, watchdog_cfg.idle_sec, watchdog_cfg.min_delta_bytes);
    let start = Instant::now();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));

    loop {
        ticker.tick().await;

        let marker_present = marker_path.is_file();
        let job_cancelled = matches!(store.get_job(job_id).await, Ok(job) if job.state == JobState::Cancelled);
        if marker_present || job_cancelled {
            *reason.lock().unwrap() = Some(CancelReason::ControlPlane);
            let _ = cancel_tx.send(true);
            return;
        }

        let bytes = sum_directory_bytes(&release_dir).await;
        if watchdog.sample(start.elapsed(), bytes) {
            *reason.lock().unwrap() = Some(CancelReason::Stalled);
            let _ = cancel_tx.send(true);
            return;
        }
    }
}

async fn sum_directory_bytes(dir: &Path) -> u64 {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return 0;
    };
    let mut total = 0u64;
    while let Ok(Some(entry)) = entries.next_entry().await {
        if let Ok(metadata) = entry.metadata().await {
            if metadata.is_file() {
                total += metadata.len();
            }
        }
    }
    total
}

fn retry_outcome_to_cycle(outcome: factory_store::RetryOutcome) -> OrchestratorOutcome {
    match outcome {
        factory_store::RetryOutcome::Retried { .. } => OrchestratorOutcome::Retried,
        factory_store::RetryOutcome::Terminal { .. } => OrchestratorOutcome::Terminal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::origin::LocalOrigin;
    use factory_store::{create_pool, DbConfig};

    async fn seeded_store_with_ready_job() -> Store {
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
        sqlx::query(
            "INSERT INTO jobs (release_id, job_type, state, stage, priority, attempt, created_at, updated_at) VALUES (1, 'render', 'READY_FOR_RENDER', 'RENDER', 0, 0, datetime('now'), datetime('now'))",
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
            renderer_path: PathBuf::from("/nonexistent/renderer"),
            origin_backend: crate::config::OriginBackend::Local,
            origin_local_root: storage_root.join("origin"),
            upload_backend: crate::config::UploadBackend::Mock,
            qa_volumedetect_seconds: 10,
            job_lock_ttl_sec: 3600,
            retry_backoff_sec: 60,
            max_render_attempts: 3,
            max_upload_attempts: 3,
            worker_sleep_sec: 1,
            watchdog: WatchdogConfig::default(),
            policies_path: None,
            yt_tokens_base: None,
            yt_global_client_secret: None,
            yt_global_token: None,
        }
    }

    #[tokio::test]
    async fn job_with_no_inputs_retries_without_spawning_renderer() {
        let store = seeded_store_with_ready_job().await;
        let dir = tempfile::tempdir().unwrap();
        let origin = LocalOrigin::new(dir.path());
        let config = test_config(dir.path());

        let outcome = run_once(&store, &origin, &config, "worker-1").await.unwrap();
        assert_eq!(outcome, OrchestratorOutcome::Retried);

        let job = store.get_job(1).await.unwrap();
        assert_eq!(job.state, JobState::ReadyForRender);
        assert_eq!(job.attempt, 1);
    }

    #[tokio::test]
    async fn newest_mp4_under_picks_most_recently_modified() {
        let dir = tempfile::tempdir().unwrap();
        let older = dir.path().join("a.mp4");
        tokio::fs::write(&older, b"a").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let newer = dir.path().join("b.mp4");
        tokio::fs::write(&newer, b"b").await.unwrap();

        let found = newest_mp4_under(dir.path()).await.unwrap().unwrap();
        assert_eq!(found, newer);
    }

    #[test]
    fn retry_outcome_maps_to_cycle_outcomes() {
        assert_eq!(
            retry_outcome_to_cycle(factory_store::RetryOutcome::Retried { attempt: 1 }),
            OrchestratorOutcome::Retried
        );
        assert_eq!(
            retry_outcome_to_cycle(factory_store::RetryOutcome::Terminal { attempt: 3 }),
            OrchestratorOutcome::Terminal
        );
    }
}
