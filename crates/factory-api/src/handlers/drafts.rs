//! Draft submission: the operator-facing entry point that turns a
//! UI-composed background/cover/audio selection into a `DRAFT` job and
//! runs preflight synchronously before returning.

use axum::extract::State;
use axum::Json;
use factory_models::{JobStage, JobState};
use factory_worker::{run_preflight, FieldErrors, PreflightOutcome};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiResult;
use crate::security::BasicAuth;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitDraftRequest {
    pub channel_slug: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub background_name: String,
    pub background_ext: String,
    #[serde(default)]
    pub cover_name: Option<String>,
    #[serde(default)]
    pub cover_ext: Option<String>,
    /// Whitespace-separated audio id tokens, matched against the track
    /// catalog at preflight time.
    pub audio_ids_text: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitDraftResponse {
    Promoted { job_id: i64 },
    Rejected { job_id: i64, errors: FieldErrors },
}

/// `POST /v1/drafts`
pub async fn submit_draft(
    State(state): State<AppState>,
    _auth: BasicAuth,
    Json(req): Json<SubmitDraftRequest>,
) -> ApiResult<Json<SubmitDraftResponse>> {
    let channel = state.store.get_channel_by_slug(&req.channel_slug).await?;

    let origin_meta_key = format!("draft:{}:{}", req.channel_slug, req.title);
    let (release, _created) = state
        .store
        .insert_release_if_new(channel.id, &req.title, &req.description, &req.tags.join(","), &origin_meta_key)
        .await?;

    let job_id = match state.store.job_for_release(release.id).await? {
        Some(job) => job.id,
        None => state.store.insert_job(release.id, "render", JobState::Draft, JobStage::Render, 0).await?,
    };

    state
        .store
        .insert_job_draft(
            job_id,
            &req.background_name,
            &req.background_ext,
            req.cover_name.as_deref(),
            req.cover_ext.as_deref(),
            &req.audio_ids_text,
        )
        .await?;

    info!(job_id, channel = %req.channel_slug, "draft submitted, running preflight");

    match run_preflight(&state.store, state.origin.as_ref(), job_id).await? {
        PreflightOutcome::Promoted => Ok(Json(SubmitDraftResponse::Promoted { job_id })),
        PreflightOutcome::Rejected(errors) => Ok(Json(SubmitDraftResponse::Rejected { job_id, errors })),
    }
}
