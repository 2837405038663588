//! Draft preflight: validates a user-composed draft's background, cover,
//! and audio-id references against the origin before enqueue, and on
//! success materializes the draft into real asset links and promotes the
//! job `DRAFT → READY_FOR_RENDER`.

use std::path::PathBuf;

use factory_models::{AssetKind, AssetOrigin, JobInputRole, JobState};
use factory_store::Store;
use serde::Serialize;
use tracing::info;

use crate::error::{WorkerError, WorkerResult};
use crate::origin::Origin;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors {
    pub background: Vec<String>,
    pub cover: Vec<String>,
    pub audio: Vec<String>,
}

impl FieldErrors {
    fn is_empty(&self) -> bool {
        self.background.is_empty() && self.cover.is_empty() && self.audio.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreflightOutcome {
    Promoted,
    Rejected(FieldErrors),
}

pub async fn run_preflight(store: &Store, origin: &dyn Origin, job_id: i64) -> WorkerResult<PreflightOutcome> {
    let job = store.get_job(job_id).await?;
    let draft = store
        .get_job_draft(job_id)
        .await?
        .ok_or_else(|| WorkerError::Config(format!("no draft recorded for job {job_id}")))?;
    let release = store.get_release(job.release_id).await?;
    let channel = store.get_channel(release.channel_id).await?;
    let channel_root = origin.channel_root(&channel.slug);

    let mut errors = FieldErrors::default();

    let background_asset = match origin.find_folder(&channel_root, "Image").await? {
        Some(dir) => resolve_single(origin, &dir, &draft.background_name, &draft.background_ext, &mut errors.background).await?,
        None => {
            errors.background.push("Image folder not found".to_string());
            None
        }
    };

    let cover_asset = resolve_cover(origin, &channel_root, &draft, &mut errors).await?;

    let normalized_ids = normalize_audio_ids(&draft.audio_ids_text, &mut errors.audio);
    let track_assets = if errors.audio.is_empty() {
        resolve_tracks(origin, &channel_root, &normalized_ids, &mut errors.audio).await?
    } else {
        Vec::new()
    };

    if !errors.is_empty() {
        return Ok(PreflightOutcome::Rejected(errors));
    }

    for (order, path) in track_assets.into_iter().enumerate() {
        let asset_id = store
            .insert_asset(release.id, AssetKind::Audio, AssetOrigin::Local, None, Some(&path.to_string_lossy()))
            .await?;
        store.attach_input_link(job_id, asset_id, JobInputRole::Track, order as i32).await?;
    }
    if let Some(path) = background_asset {
        let asset_id = store
            .insert_asset(release.id, AssetKind::Image, AssetOrigin::Local, None, Some(&path.to_string_lossy()))
            .await?;
        store.attach_input_link(job_id, asset_id, JobInputRole::Background, 0).await?;
    }
    if let Some(path) = cover_asset {
        let asset_id = store
            .insert_asset(release.id, AssetKind::Image, AssetOrigin::Local, None, Some(&path.to_string_lossy()))
            .await?;
        store.attach_input_link(job_id, asset_id, JobInputRole::Cover, 0).await?;
    }

    store.transition_in_place(job_id, JobState::ReadyForRender).await?;
    info!(job_id, "preflight passed, draft promoted");
    Ok(PreflightOutcome::Promoted)
}

async fn resolve_single(
    origin: &dyn Origin,
    dir: &std::path::Path,
    name: &str,
    ext: &str,
    errors: &mut Vec<String>,
) -> WorkerResult<Option<PathBuf>> {
    let target = format!("{name}.{ext}");
    let matches = origin.find_file(dir, &target).await?;
    match matches.len() {
        1 => Ok(Some(matches.into_iter().next().unwrap())),
        n => {
            errors.push(format!("{target}: matches={n}"));
            Ok(None)
        }
    }
}

async fn resolve_cover(
    origin: &dyn Origin,
    channel_root: &std::path::Path,
    draft: &factory_models::JobDraft,
    errors: &mut FieldErrors,
) -> WorkerResult<Option<PathBuf>> {
    let name = draft.cover_name.as_deref().unwrap_or("").trim();
    let ext = draft.cover_ext.as_deref().unwrap_or("").trim();
    if name.is_empty() && ext.is_empty() {
        return Ok(None);
    }
    if name.is_empty() || ext.is_empty() {
        errors.cover.push("cover name/ext must be both set".to_string());
        return Ok(None);
    }
    match origin.find_folder(channel_root, "Covers").await? {
        Some(dir) => resolve_single(origin, &dir, name, ext, &mut errors.cover).await,
        None => {
            errors.cover.push("Covers folder not found".to_string());
            Ok(None)
        }
    }
}

/// Normalizes whitespace-separated audio id tokens to 3-digit form,
/// pushing a per-token error for anything that isn't a bare or
/// already-3-digit integer.
fn normalize_audio_ids(raw: &str, errors: &mut Vec<String>) -> Vec<String> {
    let mut normalized = Vec::new();
    for token in raw.split_whitespace() {
        if token.len() == 3 && token.chars().all(|c| c.is_ascii_digit()) {
            normalized.push(token.to_string());
        } else if !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()) {
            match token.parse::<u32>() {
                Ok(n) => normalized.push(format!("{n:03}")),
                Err(_) => errors.push(format!("invalid audio id '{token}'")),
            }
        } else {
            errors.push(format!("invalid audio id '{token}'"));
        }
    }
    if normalized.is_empty() && errors.is_empty() {
        errors.push("audio ids are required".to_string());
    }
    normalized
}

/// Each normalized id must match exactly one `NNN_*.wav` anywhere under
/// `Audio/`.
async fn resolve_tracks(
    origin: &dyn Origin,
    channel_root: &std::path::Path,
    ids: &[String],
    errors: &mut Vec<String>,
) -> WorkerResult<Vec<PathBuf>> {
    let Some(audio_dir) = origin.find_folder(channel_root, "Audio").await? else {
        errors.push("Audio folder not found".to_string());
        return Ok(Vec::new());
    };
    let all_files = origin.enumerate_tree(&audio_dir).await?;

    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        let matches: Vec<&PathBuf> = all_files
            .iter()
            .filter(|path| matches_canonical_wav(path, id))
            .collect();
        match matches.len() {
            1 => out.push(matches[0].clone()),
            n => errors.push(format!("audio id {id}: matches={n}")),
        }
    }
    Ok(out)
}

fn matches_canonical_wav(path: &std::path::Path, id: &str) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if !name.to_ascii_lowercase().ends_with(".wav") {
        return false;
    }
    let Some(prefix) = name.split('_').next() else {
        return false;
    };
    prefix == id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_bare_digits_to_three_digit_form() {
        let mut errors = Vec::new();
        let ids = normalize_audio_ids("1 015 003", &mut errors);
        assert!(errors.is_empty());
        assert_eq!(ids, vec!["001", "015", "003"]);
    }

    #[test]
    fn rejects_non_numeric_token() {
        let mut errors = Vec::new();
        let ids = normalize_audio_ids("abc", &mut errors);
        assert!(ids.is_empty());
        assert_eq!(errors, vec!["invalid audio id 'abc'".to_string()]);
    }

    #[test]
    fn empty_input_is_required_error() {
        let mut errors = Vec::new();
        let ids = normalize_audio_ids("   ", &mut errors);
        assert!(ids.is_empty());
        assert_eq!(errors, vec!["audio ids are required".to_string()]);
    }

    #[test]
    fn canonical_wav_match_requires_exact_prefix() {
        assert!(matches_canonical_wav(std::path::Path::new("001_song.wav"), "001"));
        assert!(!matches_canonical_wav(std::path::Path::new("0010_song.wav"), "001"));
        assert!(!matches_canonical_wav(std::path::Path::new("001_song.mp3"), "001"));
    }
}
