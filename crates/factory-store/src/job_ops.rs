//! Job lifecycle operations: state transitions, retry/backoff, QA report
//! and upload record persistence.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use factory_models::{Job, JobState, QaReport, UploadRecord};

use crate::error::{StoreError, StoreResult};
use crate::Store;

impl Store {
    pub async fn get_job(&self, job_id: i64) -> StoreResult<Job> {
        sqlx::query_as("SELECT * FROM jobs WHERE id = ?")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::JobNotFound(job_id))
    }

    pub async fn list_jobs(&self, state: Option<JobState>) -> StoreResult<Vec<Job>> {
        match state {
            Some(state) => {
                sqlx::query_as("SELECT * FROM jobs WHERE state = ? ORDER BY id DESC")
                    .bind(state)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(Into::into)
            }
            None => sqlx::query_as("SELECT * FROM jobs ORDER BY id DESC")
                .fetch_all(&self.pool)
                .await
                .map_err(Into::into),
        }
    }

    /// Transitions `job_id` to `new_state`, clearing the lock. Every call
    /// is gated by `state != 'CANCELLED'` so a late-arriving update can
    /// never resurrect a cancelled
    /// job.
    pub async fn transition_and_release(&self, job_id: i64, new_state: JobState) -> StoreResult<bool> {
        let rows = sqlx::query(
            r#"
            UPDATE jobs
            SET state = ?, locked_by = NULL, locked_at = NULL, retry_at = NULL, updated_at = ?
            WHERE id = ? AND state != 'CANCELLED'
            "#,
        )
        .bind(new_state)
        .bind(Utc::now())
        .bind(job_id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(rows > 0)
    }

    /// Advances `job_id` to `new_state` without touching its lock — for
    /// the intermediate states a single lock-holder passes through on its
    /// own (`FETCHING_INPUTS` → `RENDERING`) before a final
    /// `transition_and_release` hands the job to the next role.
    pub async fn transition_in_place(&self, job_id: i64, new_state: JobState) -> StoreResult<bool> {
        let rows = sqlx::query(
            "UPDATE jobs SET state = ?, updated_at = ? WHERE id = ? AND state != 'CANCELLED'",
        )
        .bind(new_state)
        .bind(Utc::now())
        .bind(job_id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(rows > 0)
    }

    /// Retry policy: increments `attempt`; if still under
    /// `max_attempts`, schedules a retry back into `retry_state` after
    /// `backoff_sec`; otherwise marks `terminal_state` with `reason`.
    pub async fn apply_retry_policy(
        &self,
        job_id: i64,
        retry_state: JobState,
        terminal_state: JobState,
        max_attempts: i32,
        backoff_sec: i64,
        reason: &str,
    ) -> StoreResult<RetryOutcome> {
        let job = self.get_job(job_id).await?;
        let attempt = job.attempt + 1;

        if attempt < max_attempts {
            sqlx::query(
                r#"
                UPDATE jobs
                SET state = ?, attempt = ?, locked_by = NULL, locked_at = NULL,
                    retry_at = ?, error_reason = ?, updated_at = ?
                WHERE id = ? AND state != 'CANCELLED'
                "#,
            )
            .bind(retry_state)
            .bind(attempt)
            .bind(Utc::now() + ChronoDuration::seconds(backoff_sec))
            .bind(reason)
            .bind(Utc::now())
            .bind(job_id)
            .execute(&self.pool)
            .await?;
            Ok(RetryOutcome::Retried { attempt })
        } else {
            sqlx::query(
                r#"
                UPDATE jobs
                SET state = ?, attempt = ?, locked_by = NULL, locked_at = NULL,
                    retry_at = NULL, error_reason = ?, updated_at = ?
                WHERE id = ? AND state != 'CANCELLED'
                "#,
            )
            .bind(terminal_state)
            .bind(attempt)
            .bind(reason)
            .bind(Utc::now())
            .bind(job_id)
            .execute(&self.pool)
            .await?;
            Ok(RetryOutcome::Terminal { attempt })
        }
    }

    /// The stale-lock reclaim sweep the orchestrator runs
    /// before claiming new work. Applies the retry policy to every row in
    /// `state` whose lock has outlived `lease_ttl_sec`.
    pub async fn reclaim_stale(
        &self,
        state: JobState,
        retry_state: JobState,
        terminal_state: JobState,
        lease_ttl_sec: i64,
        max_attempts: i32,
        backoff_sec: i64,
    ) -> StoreResult<Vec<i64>> {
        let cutoff = Utc::now() - ChronoDuration::seconds(lease_ttl_sec);
        let stale_ids: Vec<i64> = sqlx::query_scalar(
            "SELECT id FROM jobs WHERE state = ? AND locked_by IS NOT NULL AND locked_at < ?",
        )
        .bind(state)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        for &job_id in &stale_ids {
            self.apply_retry_policy(
                job_id,
                retry_state,
                terminal_state,
                max_attempts,
                backoff_sec,
                "stale lock reclaimed",
            )
            .await?;
        }

        Ok(stale_ids)
    }

    /// Sets the advisory progress fields; callers are responsible for the
    /// "at most ~1 write per 2s, or ≥0.5 growth" throttling policy.
    pub async fn set_progress(&self, job_id: i64, pct: f64, text: &str) -> StoreResult<()> {
        sqlx::query(
            "UPDATE jobs SET progress_pct = ?, progress_text = ?, updated_at = ? WHERE id = ? AND state != 'CANCELLED'",
        )
        .bind(pct)
        .bind(text)
        .bind(Utc::now())
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_cancelled(&self, job_id: i64) -> StoreResult<bool> {
        let rows = sqlx::query(
            r#"
            UPDATE jobs
            SET state = 'CANCELLED', locked_by = NULL, locked_at = NULL, retry_at = NULL, updated_at = ?
            WHERE id = ? AND state NOT IN ('CANCELLED', 'REJECTED', 'PUBLISHED', 'CLEANED')
            "#,
        )
        .bind(Utc::now())
        .bind(job_id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(rows > 0)
    }

    pub async fn approve(&self, job_id: i64) -> StoreResult<bool> {
        let rows = sqlx::query(
            "UPDATE jobs SET state = 'APPROVED', updated_at = ? WHERE id = ? AND state = 'WAIT_APPROVAL'",
        )
        .bind(Utc::now())
        .bind(job_id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(rows > 0)
    }

    pub async fn reject(&self, job_id: i64) -> StoreResult<bool> {
        let rows = sqlx::query(
            "UPDATE jobs SET state = 'REJECTED', updated_at = ? WHERE id = ? AND state = 'WAIT_APPROVAL'",
        )
        .bind(Utc::now())
        .bind(job_id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(rows > 0)
    }

    /// Records `published_at = now` and `delete_mp4_at = now + 48h`.
    pub async fn mark_published(&self, job_id: i64) -> StoreResult<Option<DateTime<Utc>>> {
        let now = Utc::now();
        let delete_at = now + ChronoDuration::hours(crate::RETENTION_HOURS);
        let rows = sqlx::query(
            r#"
            UPDATE jobs
            SET state = 'PUBLISHED', published_at = ?, delete_mp4_at = ?, updated_at = ?
            WHERE id = ? AND state IN ('APPROVED', 'WAIT_APPROVAL')
            "#,
        )
        .bind(now)
        .bind(delete_at)
        .bind(now)
        .bind(job_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok((rows > 0).then_some(delete_at))
    }

    pub async fn mark_cleaned(&self, job_id: i64) -> StoreResult<()> {
        sqlx::query("UPDATE jobs SET state = 'CLEANED', updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Jobs eligible for MP4 deletion: `PUBLISHED` with `delete_mp4_at <= now`.
    pub async fn jobs_due_for_cleanup(&self) -> StoreResult<Vec<Job>> {
        sqlx::query_as("SELECT * FROM jobs WHERE state = 'PUBLISHED' AND delete_mp4_at <= ?")
            .bind(Utc::now())
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }

    pub async fn insert_qa_report(&self, report: &QaReport) -> StoreResult<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO qa_reports (
                job_id, hard_ok, warnings, info, probed_width, probed_height, probed_fps,
                probed_video_codec, probed_audio_codec, probed_sample_rate, probed_channels,
                expected_duration_sec, actual_duration_sec, mean_volume_db, max_volume_db, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(job_id) DO UPDATE SET
                hard_ok = excluded.hard_ok, warnings = excluded.warnings, info = excluded.info,
                probed_width = excluded.probed_width, probed_height = excluded.probed_height,
                probed_fps = excluded.probed_fps, probed_video_codec = excluded.probed_video_codec,
                probed_audio_codec = excluded.probed_audio_codec, probed_sample_rate = excluded.probed_sample_rate,
                probed_channels = excluded.probed_channels, expected_duration_sec = excluded.expected_duration_sec,
                actual_duration_sec = excluded.actual_duration_sec, mean_volume_db = excluded.mean_volume_db,
                max_volume_db = excluded.max_volume_db, created_at = excluded.created_at
            RETURNING id
            "#,
        )
        .bind(report.job_id)
        .bind(report.hard_ok)
        .bind(serde_json::to_string(&report.warnings)?)
        .bind(serde_json::to_string(&report.info)?)
        .bind(report.probed_width)
        .bind(report.probed_height)
        .bind(report.probed_fps)
        .bind(&report.probed_video_codec)
        .bind(&report.probed_audio_codec)
        .bind(report.probed_sample_rate)
        .bind(report.probed_channels)
        .bind(report.expected_duration_sec)
        .bind(report.actual_duration_sec)
        .bind(report.mean_volume_db)
        .bind(report.max_volume_db)
        .bind(report.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn get_qa_report(&self, job_id: i64) -> StoreResult<Option<QaReport>> {
        let row: Option<QaReportRow> = sqlx::query_as("SELECT * FROM qa_reports WHERE job_id = ?")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    /// Idempotency check: a non-empty `video_id` already on
    /// record means the upload already happened.
    pub async fn get_upload_record(&self, job_id: i64) -> StoreResult<Option<UploadRecord>> {
        sqlx::query_as("SELECT * FROM upload_records WHERE job_id = ?")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    pub async fn insert_upload_record(&self, record: &UploadRecord) -> StoreResult<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO upload_records (job_id, video_id, view_url, edit_url, privacy, uploaded_at, error)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(job_id) DO UPDATE SET
                video_id = excluded.video_id, view_url = excluded.view_url, edit_url = excluded.edit_url,
                privacy = excluded.privacy, uploaded_at = excluded.uploaded_at, error = excluded.error
            RETURNING id
            "#,
        )
        .bind(record.job_id)
        .bind(&record.video_id)
        .bind(&record.view_url)
        .bind(&record.edit_url)
        .bind(&record.privacy)
        .bind(record.uploaded_at)
        .bind(&record.error)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    Retried { attempt: i32 },
    Terminal { attempt: i32 },
}

#[derive(Debug, sqlx::FromRow)]
struct QaReportRow {
    id: i64,
    job_id: i64,
    hard_ok: bool,
    warnings: String,
    info: String,
    probed_width: Option<i64>,
    probed_height: Option<i64>,
    probed_fps: Option<f64>,
    probed_video_codec: Option<String>,
    probed_audio_codec: Option<String>,
    probed_sample_rate: Option<i64>,
    probed_channels: Option<i64>,
    expected_duration_sec: Option<f64>,
    actual_duration_sec: Option<f64>,
    mean_volume_db: Option<f64>,
    max_volume_db: Option<f64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<QaReportRow> for QaReport {
    type Error = StoreError;

    fn try_from(row: QaReportRow) -> Result<Self, Self::Error> {
        Ok(QaReport {
            id: row.id,
            job_id: row.job_id,
            hard_ok: row.hard_ok,
            warnings: serde_json::from_str(&row.warnings)?,
            info: serde_json::from_str(&row.info)?,
            probed_width: row.probed_width,
            probed_height: row.probed_height,
            probed_fps: row.probed_fps,
            probed_video_codec: row.probed_video_codec,
            probed_audio_codec: row.probed_audio_codec,
            probed_sample_rate: row.probed_sample_rate,
            probed_channels: row.probed_channels,
            expected_duration_sec: row.expected_duration_sec,
            actual_duration_sec: row.actual_duration_sec,
            mean_volume_db: row.mean_volume_db,
            max_volume_db: row.max_volume_db,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{create_pool, DbConfig};

    async fn store_with_one_job() -> (Store, i64) {
        let pool = create_pool(DbConfig::sqlite_memory()).await.unwrap();
        sqlx::query(
            "INSERT INTO render_profiles (name, video_width, video_height, video_fps, video_codec, audio_sample_rate, audio_channels, audio_codec) VALUES ('default', 1920, 1080, 24, 'h264', 48000, 2, 'aac')",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO channels (slug, display_name, render_profile_id, autopublish, created_at) VALUES ('c', 'C', 1, 0, datetime('now'))",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO releases (channel_id, title, description, tags, origin_meta_key, created_at) VALUES (1, 't', '', '', 'k', datetime('now'))",
        )
        .execute(&pool)
        .await
        .unwrap();
        let job_id: i64 = sqlx::query_scalar(
            "INSERT INTO jobs (release_id, job_type, state, stage, priority, attempt, created_at, updated_at) VALUES (1, 'RENDER_LONG', 'RENDERING', 'RENDER', 0, 0, datetime('now'), datetime('now')) RETURNING id",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        (Store::new(pool), job_id)
    }

    #[tokio::test]
    async fn cancel_is_monotonic() {
        let (store, job_id) = store_with_one_job().await;
        assert!(store.mark_cancelled(job_id).await.unwrap());

        // A late-arriving transition must not resurrect the job.
        let changed = store.transition_and_release(job_id, JobState::Rendering).await.unwrap();
        assert!(!changed);

        let job = store.get_job(job_id).await.unwrap();
        assert_eq!(job.state, JobState::Cancelled);
    }

    #[tokio::test]
    async fn retry_policy_retries_then_terminates() {
        let (store, job_id) = store_with_one_job().await;

        let outcome = store
            .apply_retry_policy(job_id, JobState::ReadyForRender, JobState::RenderFailed, 3, 1, "boom")
            .await
            .unwrap();
        assert_eq!(outcome, RetryOutcome::Retried { attempt: 1 });

        for _ in 0..5 {
            store
                .apply_retry_policy(job_id, JobState::ReadyForRender, JobState::RenderFailed, 3, 1, "boom")
                .await
                .unwrap();
        }

        let job = store.get_job(job_id).await.unwrap();
        assert_eq!(job.state, JobState::RenderFailed);
        assert!(job.attempt >= 3);
    }

    #[tokio::test]
    async fn retention_law_sets_delete_at_48h_after_published() {
        let (store, job_id) = store_with_one_job().await;
        sqlx::query("UPDATE jobs SET state = 'WAIT_APPROVAL' WHERE id = ?")
            .bind(job_id)
            .execute(&store.pool)
            .await
            .unwrap();

        let delete_at = store.mark_published(job_id).await.unwrap().unwrap();
        let job = store.get_job(job_id).await.unwrap();
        let published_at = job.published_at.unwrap();
        assert_eq!(delete_at, published_at + ChronoDuration::hours(48));
    }
}
