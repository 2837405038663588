//! Job approval/retention handlers: the human control surface over the
//! lifecycle state machine workers otherwise drive on their own.

use axum::extract::{Path, Query, State};
use axum::Json;
use factory_models::{Job, JobState, QaReport};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::security::BasicAuth;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ApproveBody {
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RejectBody {
    pub comment: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct CancelBody {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct MarkPublishedResponse {
    pub delete_mp4_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default)]
    pub tail: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub job_id: i64,
    pub lines: Vec<String>,
}

fn parse_job_state(raw: &str) -> ApiResult<JobState> {
    serde_json::from_value(serde_json::Value::String(raw.to_uppercase()))
        .map_err(|_| ApiError::bad_request(format!("unknown job state '{raw}'")))
}

/// `GET /v1/jobs?state=`
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
    _auth: BasicAuth,
) -> ApiResult<Json<Vec<Job>>> {
    let job_state = query.state.as_deref().map(parse_job_state).transpose()?;
    let jobs = state.store.list_jobs(job_state).await?;
    Ok(Json(jobs))
}

/// `GET /v1/jobs/{id}`
pub async fn get_job(State(state): State<AppState>, Path(job_id): Path<i64>, _auth: BasicAuth) -> ApiResult<Json<Job>> {
    let job = state.store.get_job(job_id).await?;
    Ok(Json(job))
}

/// `GET /v1/jobs/{id}/qa`
pub async fn get_qa(State(state): State<AppState>, Path(job_id): Path<i64>, _auth: BasicAuth) -> ApiResult<Json<QaReport>> {
    let report = state
        .store
        .get_qa_report(job_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no QA report for job {job_id}")))?;
    Ok(Json(report))
}

/// `GET /v1/jobs/{id}/logs?tail=` (default tail: 200 lines)
pub async fn get_logs(
    State(state): State<AppState>,
    Path(job_id): Path<i64>,
    Query(query): Query<LogsQuery>,
    _auth: BasicAuth,
) -> ApiResult<Json<LogsResponse>> {
    let path = factory_worker::paths::log_path(&state.config.storage_root, job_id);
    let contents = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| ApiError::not_found(format!("no log for job {job_id}: {e}")))?;

    let tail = query.tail.unwrap_or(200);
    let mut lines: Vec<String> = contents.lines().map(str::to_string).collect();
    let start = lines.len().saturating_sub(tail);
    lines = lines.split_off(start);

    Ok(Json(LogsResponse { job_id, lines }))
}

/// `POST /v1/jobs/{id}/approve`
pub async fn approve(
    State(state): State<AppState>,
    Path(job_id): Path<i64>,
    _auth: BasicAuth,
    body: Option<Json<ApproveBody>>,
) -> ApiResult<Json<OkResponse>> {
    let comment = body.and_then(|Json(b)| b.comment);
    info!(job_id, ?comment, "approve");
    if state.store.approve(job_id).await? {
        metrics::record_job_transition("approve");
        Ok(Json(OkResponse { ok: true }))
    } else {
        Err(ApiError::Conflict(format!("job {job_id} is not WAIT_APPROVAL")))
    }
}

/// `POST /v1/jobs/{id}/reject`
pub async fn reject(
    State(state): State<AppState>,
    Path(job_id): Path<i64>,
    _auth: BasicAuth,
    Json(body): Json<RejectBody>,
) -> ApiResult<Json<OkResponse>> {
    info!(job_id, comment = %body.comment, "reject");
    if state.store.reject(job_id).await? {
        metrics::record_job_transition("reject");
        Ok(Json(OkResponse { ok: true }))
    } else {
        Err(ApiError::Conflict(format!("job {job_id} is not WAIT_APPROVAL")))
    }
}

/// `POST /v1/jobs/{id}/cancel`
pub async fn cancel(
    State(state): State<AppState>,
    Path(job_id): Path<i64>,
    _auth: BasicAuth,
    body: Option<Json<CancelBody>>,
) -> ApiResult<Json<OkResponse>> {
    let reason = body.and_then(|Json(b)| b.reason);
    info!(job_id, ?reason, "cancel");
    if state.store.mark_cancelled(job_id).await? {
        metrics::record_job_transition("cancel");
        Ok(Json(OkResponse { ok: true }))
    } else {
        Err(ApiError::Conflict(format!("job {job_id} is already terminal")))
    }
}

/// `POST /v1/jobs/{id}/mark_published`
pub async fn mark_published(
    State(state): State<AppState>,
    Path(job_id): Path<i64>,
    _auth: BasicAuth,
) -> ApiResult<Json<MarkPublishedResponse>> {
    match state.store.mark_published(job_id).await? {
        Some(delete_mp4_at) => {
            metrics::record_job_transition("mark_published");
            Ok(Json(MarkPublishedResponse { delete_mp4_at }))
        }
        None => Err(ApiError::Conflict(format!("job {job_id} is not APPROVED or WAIT_APPROVAL"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_states_case_insensitively() {
        assert_eq!(parse_job_state("wait_approval").unwrap(), JobState::WaitApproval);
        assert_eq!(parse_job_state("PUBLISHED").unwrap(), JobState::Published);
    }

    #[test]
    fn rejects_unknown_state() {
        assert!(parse_job_state("not_a_state").is_err());
    }
}
