//! QA gate: probes a rendered MP4 against its channel's render profile
//! and a configured `QaPolicy`, persists the report, and routes the job
//! to `UPLOADING` or `QA_FAILED`.

use chrono::Utc;
use factory_media::{probe_video, volumedetect, MediaProbe};
use factory_models::{JobOutputRole, JobState, QaReport};
use factory_store::Store;
use tracing::info;

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::policies::QaPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QaOutcome {
    Idle,
    Passed,
    Failed,
}

pub async fn run_once(store: &Store, config: &WorkerConfig, policy: &QaPolicy, worker_id: &str) -> WorkerResult<QaOutcome> {
    let Some(job) = store.claim(JobState::QaRunning, worker_id, config.job_lock_ttl_sec).await? else {
        return Ok(QaOutcome::Idle);
    };
    let job_id = job.id;

    let outputs = store.list_output_links(job_id).await?;
    let mp4_link = outputs.iter().find(|o| o.role == JobOutputRole::Mp4);
    let Some(mp4_link) = mp4_link else {
        return fail(store, job_id, "QA blocked: no MP4 output registered", None).await;
    };
    let mp4_asset = store.get_asset(mp4_link.asset_id).await?;
    let Some(mp4_path) = mp4_asset.and_then(|a| a.local_path) else {
        return fail(store, job_id, "QA blocked: MP4 asset has no local path", None).await;
    };
    if !std::path::Path::new(&mp4_path).is_file() {
        return fail(store, job_id, "QA blocked: MP4 file missing from outbox", None).await;
    }

    let release = store.get_release(job.release_id).await?;
    let channel = store.get_channel(release.channel_id).await?;
    let profile = store.render_profile_for_channel(&channel).await?;

    let probe = match probe_video(&mp4_path).await {
        Ok(p) => p,
        Err(e) => return fail(store, job_id, &format!("QA blocked: probe error: {e}"), None).await,
    };

    let (video, audio) = match (&probe.video, &probe.audio) {
        (Some(v), Some(a)) => (v, a),
        _ => return fail(store, job_id, "QA blocked: missing video or audio stream", Some(probe.clone())).await,
    };

    let loudness = volumedetect(&mp4_path, config.qa_volumedetect_seconds).await.ok();

    let mut warnings = Vec::new();
    let mut info_lines = Vec::new();

    if let Some(fps) = video.fps {
        if (fps - policy.fps_target).abs() > policy.fps_tolerance {
            warnings.push(format!("fps {fps:.2} deviates from target {:.2}", policy.fps_target));
        }
    }
    if video.width != Some(profile.video_width as u32) || video.height != Some(profile.video_height as u32) {
        warnings.push(format!(
            "resolution {:?}x{:?} does not match profile {}x{}",
            video.width, video.height, profile.video_width, profile.video_height
        ));
    }
    if video.codec_name.as_deref() != Some(profile.video_codec.as_str()) {
        warnings.push(format!("video codec {:?} does not match profile {}", video.codec_name, profile.video_codec));
    }
    if audio.codec_name.as_deref() != Some(profile.audio_codec.as_str()) {
        warnings.push(format!("audio codec {:?} does not match profile {}", audio.codec_name, profile.audio_codec));
    }
    if audio.sample_rate != Some(profile.audio_sample_rate as u32) {
        warnings.push(format!(
            "sample rate {:?} does not match profile {}",
            audio.sample_rate, profile.audio_sample_rate
        ));
    }
    if audio.channels != Some(profile.audio_channels as u32) {
        warnings.push(format!("channel count {:?} does not match profile {}", audio.channels, profile.audio_channels));
    }
    if let Some(loudness) = &loudness {
        if loudness.max_volume_db >= policy.warn_max_db {
            warnings.push(format!("max volume {:.1} dB risks clipping (threshold {:.1})", loudness.max_volume_db, policy.warn_max_db));
        }
        if loudness.mean_volume_db > policy.warn_mean_high_db {
            warnings.push(format!("mean volume {:.1} dB above warn threshold {:.1}", loudness.mean_volume_db, policy.warn_mean_high_db));
        }
        if loudness.mean_volume_db < policy.warn_mean_low_db {
            warnings.push(format!("mean volume {:.1} dB below warn threshold {:.1}", loudness.mean_volume_db, policy.warn_mean_low_db));
        }
        info_lines.push(format!("mean_volume_db={:.1} max_volume_db={:.1}", loudness.mean_volume_db, loudness.max_volume_db));
    }

    let video_duration = video.duration_sec.unwrap_or(probe.duration_sec);
    let audio_duration = audio.duration_sec.unwrap_or(probe.duration_sec);
    let duration_diff = (video_duration - audio_duration).abs();
    let hard_ok = duration_diff <= policy.duration_diff_hard_fail_sec;

    let report = QaReport {
        id: 0,
        job_id,
        hard_ok,
        warnings,
        info: info_lines,
        probed_width: video.width.map(|w| w as i64),
        probed_height: video.height.map(|h| h as i64),
        probed_fps: video.fps,
        probed_video_codec: video.codec_name.clone(),
        probed_audio_codec: audio.codec_name.clone(),
        probed_sample_rate: audio.sample_rate.map(|r| r as i64),
        probed_channels: audio.channels.map(|c| c as i64),
        expected_duration_sec: None,
        actual_duration_sec: Some(probe.duration_sec),
        mean_volume_db: loudness.as_ref().map(|l| l.mean_volume_db),
        max_volume_db: loudness.as_ref().map(|l| l.max_volume_db),
        created_at: Utc::now(),
    };
    store.insert_qa_report(&report).await?;
    write_report_file(&config.storage_root, job_id, &report).await?;

    if report.passes(policy.warning_blocks_pipeline) {
        store.transition_and_release(job_id, JobState::Uploading).await?;
        info!(job_id, "QA passed");
        Ok(QaOutcome::Passed)
    } else {
        store.transition_and_release(job_id, JobState::QaFailed).await?;
        info!(job_id, warnings = report.warnings.len(), "QA failed");
        Ok(QaOutcome::Failed)
    }
}

async fn fail(store: &Store, job_id: i64, reason: &str, probe: Option<MediaProbe>) -> WorkerResult<QaOutcome> {
    let report = QaReport {
        id: 0,
        job_id,
        hard_ok: false,
        warnings: Vec::new(),
        info: vec![reason.to_string()],
        probed_width: probe.as_ref().and_then(|p| p.video.as_ref()).and_then(|v| v.width).map(|w| w as i64),
        probed_height: probe.as_ref().and_then(|p| p.video.as_ref()).and_then(|v| v.height).map(|h| h as i64),
        probed_fps: probe.as_ref().and_then(|p| p.video.as_ref()).and_then(|v| v.fps),
        probed_video_codec: probe.as_ref().and_then(|p| p.video.as_ref()).and_then(|v| v.codec_name.clone()),
        probed_audio_codec: probe.as_ref().and_then(|p| p.audio.as_ref()).and_then(|a| a.codec_name.clone()),
        probed_sample_rate: probe.as_ref().and_then(|p| p.audio.as_ref()).and_then(|a| a.sample_rate).map(|r| r as i64),
        probed_channels: probe.as_ref().and_then(|p| p.audio.as_ref()).and_then(|a| a.channels).map(|c| c as i64),
        expected_duration_sec: None,
        actual_duration_sec: probe.as_ref().map(|p| p.duration_sec),
        mean_volume_db: None,
        max_volume_db: None,
        created_at: Utc::now(),
    };
    store.insert_qa_report(&report).await?;
    store.transition_and_release(job_id, JobState::QaFailed).await?;
    info!(job_id, reason, "QA hard-failed");
    Ok(QaOutcome::Failed)
}

async fn write_report_file(storage_root: &std::path::Path, job_id: i64, report: &QaReport) -> WorkerResult<()> {
    let path = crate::paths::qa_report_path(storage_root, job_id);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(report)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use factory_store::{create_pool, DbConfig};

    async fn seeded_store_with_qa_job() -> Store {
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
            "INSERT INTO jobs (release_id, job_type, state, stage, priority, attempt, created_at, updated_at) VALUES (1, 'render', 'QA_RUNNING', 'RENDER', 0, 0, datetime('now'), datetime('now'))",
        )
        .execute(&pool)
        .await
        .unwrap();
        Store::new(pool)
    }

    #[tokio::test]
    async fn job_with_no_mp4_output_fails_without_probing() {
        let store = seeded_store_with_qa_job().await;
        let dir = tempfile::tempdir().unwrap();
        let config = WorkerConfig {
            storage_root: dir.path().to_path_buf(),
            db_path: dir.path().join("factory.db"),
            renderer_path: PathBuf::from("/nonexistent/renderer"),
            origin_backend: crate::config::OriginBackend::Local,
            origin_local_root: dir.path().join("origin"),
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
        };
        let policy = QaPolicy::default();

        let outcome = run_once(&store, &config, &policy, "worker-1").await.unwrap();
        assert_eq!(outcome, QaOutcome::Failed);

        let job = store.get_job(1).await.unwrap();
        assert_eq!(job.state, JobState::QaFailed);

        let report = store.get_qa_report(1).await.unwrap().unwrap();
        assert!(!report.hard_ok);
        assert_eq!(report.info, vec!["QA blocked: no MP4 output registered".to_string()]);
    }
}
