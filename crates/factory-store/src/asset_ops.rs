//! Release/asset/job-link operations backing the Importer and
//! Orchestrator.

use chrono::Utc;
use factory_models::{
    Asset, AssetKind, AssetOrigin, Job, JobInputLink, JobInputRole, JobOutputLink, JobOutputRole,
    JobStage, JobState, Release,
};

use crate::error::{StoreError, StoreResult};
use crate::Store;

impl Store {
    pub async fn get_release(&self, release_id: i64) -> StoreResult<Release> {
        sqlx::query_as("SELECT * FROM releases WHERE id = ?")
            .bind(release_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::ReleaseNotFound(release_id))
    }

    pub async fn find_release_by_origin_key(
        &self,
        channel_id: i64,
        origin_meta_key: &str,
    ) -> StoreResult<Option<Release>> {
        sqlx::query_as("SELECT * FROM releases WHERE channel_id = ? AND origin_meta_key = ?")
            .bind(channel_id)
            .bind(origin_meta_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    /// Creates the release row iff no row exists for `(channel_id,
    /// origin_meta_key)` yet, so re-running the importer over the same
    /// folder is a no-op. Returns the existing or newly created release.
    pub async fn insert_release_if_new(
        &self,
        channel_id: i64,
        title: &str,
        description: &str,
        tags: &str,
        origin_meta_key: &str,
    ) -> StoreResult<(Release, bool)> {
        if let Some(existing) = self.find_release_by_origin_key(channel_id, origin_meta_key).await? {
            return Ok((existing, false));
        }

        let release_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO releases (channel_id, title, description, tags, origin_meta_key, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(channel_id, origin_meta_key) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(channel_id)
        .bind(title)
        .bind(description)
        .bind(tags)
        .bind(origin_meta_key)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .unwrap_or(0);

        if release_id == 0 {
            // Lost a race with a concurrent import of the same release.
            let existing = self
                .find_release_by_origin_key(channel_id, origin_meta_key)
                .await?
                .expect("release must exist after conflicting insert");
            return Ok((existing, false));
        }

        let release = self.find_release_by_origin_key(channel_id, origin_meta_key).await?.expect("just inserted");
        Ok((release, true))
    }

    pub async fn insert_asset(
        &self,
        release_id: i64,
        kind: AssetKind,
        origin: AssetOrigin,
        origin_id: Option<&str>,
        local_path: Option<&str>,
    ) -> StoreResult<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO assets (release_id, kind, origin, origin_id, local_path, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(release_id)
        .bind(kind)
        .bind(origin)
        .bind(origin_id)
        .bind(local_path)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn insert_job(
        &self,
        release_id: i64,
        job_type: &str,
        initial_state: JobState,
        stage: JobStage,
        priority: i32,
    ) -> StoreResult<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO jobs (release_id, job_type, state, stage, priority, attempt, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 0, ?, ?)
            RETURNING id
            "#,
        )
        .bind(release_id)
        .bind(job_type)
        .bind(initial_state)
        .bind(stage)
        .bind(priority)
        .bind(Utc::now())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn job_for_release(&self, release_id: i64) -> StoreResult<Option<Job>> {
        sqlx::query_as("SELECT * FROM jobs WHERE release_id = ?")
            .bind(release_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    pub async fn attach_input_link(
        &self,
        job_id: i64,
        asset_id: i64,
        role: JobInputRole,
        order: i32,
    ) -> StoreResult<()> {
        sqlx::query(r#"INSERT INTO job_input_links (job_id, asset_id, role, "order") VALUES (?, ?, ?, ?)"#)
            .bind(job_id)
            .bind(asset_id)
            .bind(role)
            .bind(order)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list_input_links(&self, job_id: i64) -> StoreResult<Vec<JobInputLink>> {
        sqlx::query_as(r#"SELECT * FROM job_input_links WHERE job_id = ? ORDER BY "order" ASC"#)
            .bind(job_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }

    pub async fn count_input_links(&self, job_id: i64) -> StoreResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM job_input_links WHERE job_id = ?")
            .bind(job_id)
            .fetch_one(&self.pool)
            .await
            .map_err(Into::into)
    }

    pub async fn get_asset(&self, asset_id: i64) -> StoreResult<Option<Asset>> {
        sqlx::query_as("SELECT * FROM assets WHERE id = ?")
            .bind(asset_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    pub async fn register_output(
        &self,
        job_id: i64,
        release_id: i64,
        kind: AssetKind,
        local_path: &str,
        role: JobOutputRole,
    ) -> StoreResult<i64> {
        let asset_id = self
            .insert_asset(release_id, kind, AssetOrigin::Local, None, Some(local_path))
            .await?;
        sqlx::query("INSERT INTO job_output_links (job_id, asset_id, role, created_at) VALUES (?, ?, ?, ?)")
            .bind(job_id)
            .bind(asset_id)
            .bind(role)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(asset_id)
    }

    pub async fn list_output_links(&self, job_id: i64) -> StoreResult<Vec<JobOutputLink>> {
        sqlx::query_as("SELECT * FROM job_output_links WHERE job_id = ?")
            .bind(job_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{create_pool, DbConfig};

    async fn seeded_store() -> (Store, i64) {
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
        (Store::new(pool), 1)
    }

    #[tokio::test]
    async fn import_is_idempotent() {
        let (store, channel_id) = seeded_store().await;

        let (r1, created1) = store
            .insert_release_if_new(channel_id, "t", "d", "", "origin-key")
            .await
            .unwrap();
        assert!(created1);

        let (r2, created2) = store
            .insert_release_if_new(channel_id, "t", "d", "", "origin-key")
            .await
            .unwrap();
        assert!(!created2);
        assert_eq!(r1.id, r2.id);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM releases")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
