//! Importer: scans a channel's incoming folders, materializes releases and
//! their input links, and promotes previously-waiting jobs once their
//! inputs appear.

use factory_models::{AssetKind, AssetOrigin, JobInputRole, JobState, JobStage, Release, ReleaseMeta};
use factory_store::Store;
use tracing::{info, warn};

use crate::error::WorkerResult;
use crate::origin::{IncomingRelease, Origin};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ImporterSummary {
    pub releases_created: usize,
    pub releases_existing: usize,
    pub promoted: usize,
}

pub async fn run_once(store: &Store, origin: &dyn Origin) -> WorkerResult<ImporterSummary> {
    let mut summary = ImporterSummary::default();
    for channel in store.list_channels().await? {
        let incoming = origin.list_channel_incoming(&channel.slug).await?;
        for release_folder in incoming {
            if let Err(e) = process_release(store, origin, channel.id, &release_folder, &mut summary).await {
                warn!(channel = %channel.slug, folder = %release_folder.folder.display(), error = %e, "importer skipped release");
            }
        }
    }
    Ok(summary)
}

async fn process_release(
    store: &Store,
    origin: &dyn Origin,
    channel_id: i64,
    incoming: &IncomingRelease,
    summary: &mut ImporterSummary,
) -> WorkerResult<()> {
    let meta_raw = origin.read_text(&incoming.folder.join("meta.json")).await?;
    let meta: ReleaseMeta = serde_json::from_str(&meta_raw)?;
    let tags = meta.tags.join(",");

    let (release, created) = store
        .insert_release_if_new(channel_id, &meta.title, &meta.description, &tags, &incoming.external_id)
        .await?;
    if created {
        summary.releases_created += 1;
        info!(release_id = release.id, "imported new release");
    } else {
        summary.releases_existing += 1;
    }

    if let Some(job) = store.job_for_release(release.id).await? {
        if job.state == JobState::WaitingInputs && has_required_inputs(origin, &incoming.folder).await? {
            attach_inputs(store, &release, job.id, &meta).await?;
            store.transition_and_release(job.id, JobState::ReadyForRender).await?;
            summary.promoted += 1;
            info!(job_id = job.id, "promoted waiting job to ready_for_render");
        }
        return Ok(());
    }

    let ready = has_required_inputs(origin, &incoming.folder).await?;
    let initial_state = if ready { JobState::ReadyForRender } else { JobState::WaitingInputs };
    let job_id = store.insert_job(release.id, "render", initial_state, JobStage::Render, 0).await?;

    if ready {
        attach_inputs(store, &release, job_id, &meta).await?;
    }
    Ok(())
}

async fn has_required_inputs(origin: &dyn Origin, folder: &std::path::Path) -> WorkerResult<bool> {
    let has_audio = origin.find_folder(folder, "audio").await?.is_some();
    let has_images = origin.find_folder(folder, "images").await?.is_some();
    Ok(has_audio && has_images)
}

async fn attach_inputs(store: &Store, release: &Release, job_id: i64, meta: &ReleaseMeta) -> WorkerResult<()> {
    for (idx, relpath) in meta.assets.audio.iter().enumerate() {
        let asset_id = store
            .insert_asset(release.id, AssetKind::Audio, AssetOrigin::Local, None, Some(relpath))
            .await?;
        store.attach_input_link(job_id, asset_id, JobInputRole::Track, idx as i32).await?;
    }
    let cover_asset_id = store
        .insert_asset(release.id, AssetKind::Image, AssetOrigin::Local, None, Some(&meta.assets.cover))
        .await?;
    store.attach_input_link(job_id, cover_asset_id, JobInputRole::Cover, 0).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::origin::LocalOrigin;
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
        Store::new(pool)
    }

    async fn write_release_fixture(root: &std::path::Path, with_inputs: bool) {
        let release_dir = root.join("channels/darkwood-reverie/incoming/release-one");
        tokio::fs::create_dir_all(&release_dir).await.unwrap();
        let meta = serde_json::json!({
            "channel_slug": "darkwood-reverie",
            "title": "Episode One",
            "description": "d",
            "tags": ["ambient", "lofi"],
            "assets": { "audio": ["audio/track.wav"], "cover": "images/cover.png" }
        });
        tokio::fs::write(release_dir.join("meta.json"), meta.to_string()).await.unwrap();
        if with_inputs {
            tokio::fs::create_dir_all(release_dir.join("audio")).await.unwrap();
            tokio::fs::create_dir_all(release_dir.join("images")).await.unwrap();
        }
    }

    #[tokio::test]
    async fn creates_ready_job_when_inputs_present() {
        let store = seeded_store().await;
        let dir = tempfile::tempdir().unwrap();
        write_release_fixture(dir.path(), true).await;
        let origin = LocalOrigin::new(dir.path());

        let summary = run_once(&store, &origin).await.unwrap();
        assert_eq!(summary.releases_created, 1);

        let release = store.find_release_by_origin_key(1, &release_external_id(dir.path())).await.unwrap().unwrap();
        let job = store.job_for_release(release.id).await.unwrap().unwrap();
        assert_eq!(job.state, JobState::ReadyForRender);
        assert_eq!(store.count_input_links(job.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn waits_then_promotes_when_inputs_appear() {
        let store = seeded_store().await;
        let dir = tempfile::tempdir().unwrap();
        write_release_fixture(dir.path(), false).await;
        let origin = LocalOrigin::new(dir.path());

        run_once(&store, &origin).await.unwrap();
        let release = store.find_release_by_origin_key(1, &release_external_id(dir.path())).await.unwrap().unwrap();
        let job = store.job_for_release(release.id).await.unwrap().unwrap();
        assert_eq!(job.state, JobState::WaitingInputs);

        let release_dir = dir.path().join("channels/darkwood-reverie/incoming/release-one");
        tokio::fs::create_dir_all(release_dir.join("audio")).await.unwrap();
        tokio::fs::create_dir_all(release_dir.join("images")).await.unwrap();

        let summary = run_once(&store, &origin).await.unwrap();
        assert_eq!(summary.promoted, 1);
        let job = store.job_for_release(release.id).await.unwrap().unwrap();
        assert_eq!(job.state, JobState::ReadyForRender);
    }

    #[tokio::test]
    async fn rescanning_unchanged_origin_is_idempotent() {
        let store = seeded_store().await;
        let dir = tempfile::tempdir().unwrap();
        write_release_fixture(dir.path(), true).await;
        let origin = LocalOrigin::new(dir.path());

        run_once(&store, &origin).await.unwrap();
        run_once(&store, &origin).await.unwrap();
        run_once(&store, &origin).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM releases").fetch_one(store.pool()).await.unwrap();
        assert_eq!(count, 1);
        let job_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs").fetch_one(store.pool()).await.unwrap();
        assert_eq!(job_count, 1);
    }

    fn release_external_id(root: &std::path::Path) -> String {
        root.join("channels/darkwood-reverie/incoming/release-one")
            .canonicalize()
            .unwrap()
            .to_string_lossy()
            .into_owned()
    }
}
