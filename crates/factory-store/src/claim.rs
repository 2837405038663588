//! The atomic claim primitive.

use chrono::Utc;
use factory_models::{Job, JobState};
use tracing::debug;

use crate::error::StoreResult;
use crate::Store;

impl Store {
    /// `claim(desired_state, worker_id, lease_ttl_sec)`.
    ///
    /// In one `BEGIN IMMEDIATE` transaction: release expired leases on
    /// rows in `desired_state`, select the best eligible candidate
    /// (priority desc, created_at asc), then attempt a conditional update
    /// guarded by `locked_by IS NULL`. Returns `None` ("no job") both when
    /// nothing is eligible and when the race to claim is lost.
    pub async fn claim(
        &self,
        desired_state: JobState,
        worker_id: &str,
        lease_ttl_sec: i64,
    ) -> StoreResult<Option<Job>> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result = self
            .claim_in_transaction(&mut conn, desired_state, worker_id, lease_ttl_sec)
            .await;

        match result {
            Ok(job) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                Ok(job)
            }
            Err(err) => {
                sqlx::query("ROLLBACK").execute(&mut *conn).await.ok();
                Err(err)
            }
        }
    }

    async fn claim_in_transaction(
        &self,
        conn: &mut sqlx::pool::PoolConnection<sqlx::Sqlite>,
        desired_state: JobState,
        worker_id: &str,
        lease_ttl_sec: i64,
    ) -> StoreResult<Option<Job>> {
        let now = Utc::now();
        let lease_cutoff = now - chrono::Duration::seconds(lease_ttl_sec);

        sqlx::query(
            r#"
            UPDATE jobs
            SET locked_by = NULL, locked_at = NULL
            WHERE state = ? AND locked_by IS NOT NULL AND locked_at < ?
            "#,
        )
        .bind(desired_state)
        .bind(lease_cutoff)
        .execute(&mut **conn)
        .await?;

        let candidate_id: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT id FROM jobs
            WHERE state = ?
              AND locked_by IS NULL
              AND (retry_at IS NULL OR retry_at <= ?)
            ORDER BY priority DESC, created_at ASC
            LIMIT 1
            "#,
        )
        .bind(desired_state)
        .bind(now)
        .fetch_optional(&mut **conn)
        .await?;

        let Some(job_id) = candidate_id else {
            return Ok(None);
        };

        let rows_affected = sqlx::query(
            r#"
            UPDATE jobs
            SET locked_by = ?, locked_at = ?
            WHERE id = ? AND locked_by IS NULL
            "#,
        )
        .bind(worker_id)
        .bind(now)
        .bind(job_id)
        .execute(&mut **conn)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            debug!(job_id, worker_id, "claim race lost");
            return Ok(None);
        }

        let job: Job = sqlx::query_as("SELECT * FROM jobs WHERE id = ?")
            .bind(job_id)
            .fetch_one(&mut **conn)
            .await?;

        debug!(job_id, worker_id, ?desired_state, "job claimed");
        Ok(Some(job))
    }

    /// Releases a job's lock without changing its state — used after a
    /// clean cycle completion that already transitioned state separately.
    pub async fn release_lock(&self, job_id: i64) -> StoreResult<()> {
        sqlx::query("UPDATE jobs SET locked_by = NULL, locked_at = NULL WHERE id = ?")
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{create_pool, DbConfig};
    use factory_models::JobStage;
    use std::collections::HashSet;
    use std::sync::Arc;

    async fn seed_minimal(pool: &sqlx::SqlitePool) -> i64 {
        sqlx::query(
            "INSERT INTO render_profiles (name, video_width, video_height, video_fps, video_codec, audio_sample_rate, audio_channels, audio_codec) VALUES ('default', 1920, 1080, 24, 'h264', 48000, 2, 'aac')",
        )
        .execute(pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO channels (slug, display_name, render_profile_id, autopublish, created_at) VALUES ('darkwood-reverie', 'Darkwood Reverie', 1, 0, datetime('now'))",
        )
        .execute(pool)
        .await
        .unwrap();
        let release_id: i64 = sqlx::query_scalar(
            "INSERT INTO releases (channel_id, title, description, tags, origin_meta_key, created_at) VALUES (1, 't', '', '', 'key-1', datetime('now')) RETURNING id",
        )
        .fetch_one(pool)
        .await
        .unwrap();
        release_id
    }

    async fn seed_job(pool: &sqlx::SqlitePool, release_id: i64, priority: i32) -> i64 {
        sqlx::query_scalar(
            r#"
            INSERT INTO jobs (release_id, job_type, state, stage, priority, attempt, created_at, updated_at)
            VALUES (?, 'RENDER_LONG', 'READY_FOR_RENDER', 'RENDER', ?, 0, datetime('now'), datetime('now'))
            RETURNING id
            "#,
        )
        .bind(release_id)
        .bind(priority)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn claim_returns_none_on_empty_queue() {
        let pool = create_pool(DbConfig::sqlite_memory()).await.unwrap();
        let store = Store::new(pool);
        let job = store.claim(JobState::ReadyForRender, "w1", 3600).await.unwrap();
        assert!(job.is_none());
    }

    #[tokio::test]
    async fn claim_prefers_higher_priority() {
        let pool = create_pool(DbConfig::sqlite_memory()).await.unwrap();
        let release_id = seed_minimal(&pool).await;
        seed_job(&pool, release_id, 0).await;
        seed_job(&pool, release_id, 10).await;

        let store = Store::new(pool);
        let job = store
            .claim(JobState::ReadyForRender, "w1", 3600)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job.priority, 10);
        assert_eq!(job.stage, JobStage::Render);
    }

    #[tokio::test]
    async fn exactly_once_claim_under_concurrency() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("factory.sqlite3");
        let pool = create_pool(
            DbConfig::sqlite(db_path.to_string_lossy().to_string()).with_max_connections(20),
        )
        .await
        .unwrap();
        let release_id = seed_minimal(&pool).await;
        const JOBS: usize = 50;
        for _ in 0..JOBS {
            seed_job(&pool, release_id, 0).await;
        }

        let store = Arc::new(Store::new(pool));
        const CLAIMERS: usize = 40;
        let mut handles = Vec::new();
        for w in 0..CLAIMERS {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut claimed = Vec::new();
                loop {
                    match store
                        .claim(JobState::ReadyForRender, &format!("worker-{w}"), 3600)
                        .await
                        .unwrap()
                    {
                        Some(job) => claimed.push(job.id),
                        None => break,
                    }
                }
                claimed
            }));
        }

        let mut all_claimed = HashSet::new();
        let mut total = 0usize;
        for h in handles {
            let claimed = h.await.unwrap();
            total += claimed.len();
            for id in claimed {
                assert!(all_claimed.insert(id), "job {id} claimed more than once");
            }
        }
        assert_eq!(total, JOBS);
        assert_eq!(all_claimed.len(), JOBS);
    }
}
