//! UI draft persistence backing preflight.

use chrono::Utc;
use factory_models::JobDraft;

use crate::error::StoreResult;
use crate::Store;

impl Store {
    pub async fn insert_job_draft(
        &self,
        job_id: i64,
        background_name: &str,
        background_ext: &str,
        cover_name: Option<&str>,
        cover_ext: Option<&str>,
        audio_ids_text: &str,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO job_drafts (job_id, background_name, background_ext, cover_name, cover_ext, audio_ids_text, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(job_id) DO UPDATE SET
                background_name = excluded.background_name, background_ext = excluded.background_ext,
                cover_name = excluded.cover_name, cover_ext = excluded.cover_ext,
                audio_ids_text = excluded.audio_ids_text
            "#,
        )
        .bind(job_id)
        .bind(background_name)
        .bind(background_ext)
        .bind(cover_name)
        .bind(cover_ext)
        .bind(audio_ids_text)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_job_draft(&self, job_id: i64) -> StoreResult<Option<JobDraft>> {
        sqlx::query_as("SELECT * FROM job_drafts WHERE job_id = ?")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }
}
