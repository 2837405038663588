//! Track-catalog worker: walks each channel's `Audio/` library tree and
//! upserts structural metadata (path, normalized filename, duration) for
//! preflight's audio-id matching to consult. Scoped down from genre/mood
//! analysis to cataloguing only; has no job states of its own.

use factory_media::probe_video;
use tracing::{debug, warn};

use crate::origin::Origin;
use crate::paths;
use factory_store::Store;

use crate::error::WorkerResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanSummary {
    pub channels_scanned: u32,
    pub tracks_catalogued: u32,
}

pub async fn run_once(store: &Store, origin: &dyn Origin) -> WorkerResult<ScanSummary> {
    let mut summary = ScanSummary::default();

    for channel in store.list_channels().await? {
        let channel_root = origin.channel_root(&channel.slug);
        let Some(audio_dir) = origin.find_folder(&channel_root, "Audio").await? else {
            continue;
        };
        summary.channels_scanned += 1;

        for path in origin.enumerate_tree(&audio_dir).await? {
            if path.extension().and_then(|e| e.to_str()).map(|e| e.eq_ignore_ascii_case("wav")) != Some(true) {
                continue;
            }
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("track");
            let normalized_filename = paths::normalize_track_filename(stem);
            let duration_sec = match probe_video(&path).await {
                Ok(probe) => Some(probe.duration_sec),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "could not probe catalogued track, storing without duration");
                    None
                }
            };
            let path_str = path.to_string_lossy();
            store.upsert_track_catalog_entry(&path_str, &normalized_filename, duration_sec).await?;
            debug!(path = %path_str, "track catalogued");
            summary.tracks_catalogued += 1;
        }
    }

    Ok(summary)
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

    #[tokio::test]
    async fn catalogues_wav_files_under_channel_audio_library() {
        let store = seeded_store().await;
        let dir = tempfile::tempdir().unwrap();
        let audio_dir = dir.path().join("channels/darkwood-reverie/Audio");
        tokio::fs::create_dir_all(&audio_dir).await.unwrap();
        tokio::fs::write(audio_dir.join("Track One.wav"), b"not really audio").await.unwrap();
        tokio::fs::write(audio_dir.join("notes.txt"), b"ignored").await.unwrap();
        let origin = LocalOrigin::new(dir.path());

        let summary = run_once(&store, &origin).await.unwrap();
        assert_eq!(summary.channels_scanned, 1);
        assert_eq!(summary.tracks_catalogued, 1);

        let entries = store.list_track_catalog().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].normalized_filename, "TrackOne");
    }

    #[tokio::test]
    async fn channel_without_audio_folder_is_skipped() {
        let store = seeded_store().await;
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(dir.path().join("channels/darkwood-reverie")).await.unwrap();
        let origin = LocalOrigin::new(dir.path());

        let summary = run_once(&store, &origin).await.unwrap();
        assert_eq!(summary.channels_scanned, 0);
        assert_eq!(summary.tracks_catalogued, 0);
    }
}
