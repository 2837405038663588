//! Workspace and outbox path conventions shared by every worker role.

use std::path::{Path, PathBuf};

pub fn workspace_root(storage_root: &Path, job_id: i64) -> PathBuf {
    storage_root.join("workspace").join(format!("job_{job_id}"))
}

pub fn youtube_root(workspace_root: &Path, channel_display: &str) -> PathBuf {
    workspace_root.join("YouTubeRoot").join(sanitize_filename(channel_display))
}

pub fn audio_dir(youtube_root: &Path) -> PathBuf {
    youtube_root.join("Audio")
}

pub fn images_dir(youtube_root: &Path) -> PathBuf {
    youtube_root.join("Images")
}

pub fn release_dir(youtube_root: &Path) -> PathBuf {
    youtube_root.join("Release")
}

pub fn cancel_marker_path(youtube_root: &Path) -> PathBuf {
    youtube_root.join(".cancel")
}

pub fn playlists_path(youtube_root: &Path) -> PathBuf {
    youtube_root.join("PlayLists.txt")
}

pub fn outbox_dir(storage_root: &Path, job_id: i64) -> PathBuf {
    storage_root.join("outbox").join(format!("job_{job_id}"))
}

pub fn render_mp4_path(storage_root: &Path, job_id: i64) -> PathBuf {
    outbox_dir(storage_root, job_id).join("render.mp4")
}

pub fn cover_dir(storage_root: &Path, job_id: i64) -> PathBuf {
    outbox_dir(storage_root, job_id).join("cover")
}

pub fn preview_path(storage_root: &Path, job_id: i64) -> PathBuf {
    storage_root.join("previews").join(format!("job_{job_id}_preview60.mp4"))
}

pub fn qa_report_path(storage_root: &Path, job_id: i64) -> PathBuf {
    storage_root.join("qa").join(format!("job_{job_id}.json"))
}

pub fn log_path(storage_root: &Path, job_id: i64) -> PathBuf {
    storage_root.join("logs").join(format!("job_{job_id}.log"))
}

/// Keeps only `[A-Za-z0-9_.]`, matching the staging sanitization rule. Pure
/// character filtering, so applying it twice is a no-op.
pub fn sanitize_filename(name: &str) -> String {
    name.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '.').collect()
}

/// Normalizes an audio track's display title into the stem used for its
/// ordered filename (`NNN_<stem>.wav`); the caller supplies the order
/// prefix separately so this stays a pure, idempotent sanitizer.
pub fn normalize_track_filename(input: &str) -> String {
    sanitize_filename(input)
}

pub fn ordered_track_filename(order: u32, title: &str) -> String {
    format!("{:03}_{}.wav", order, normalize_track_filename(title))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_is_idempotent() {
        for input in ["Safe Name!!", "already_safe.wav", "a/b\\c", "", "日本語123"] {
            let once = normalize_track_filename(input);
            let twice = normalize_track_filename(&once);
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn ordered_filename_zero_pads_three_digits() {
        assert_eq!(ordered_track_filename(3, "Track One"), "003_TrackOne.wav");
        assert_eq!(ordered_track_filename(42, "x"), "042_x.wav");
    }
}
