//! Worker heartbeat upsert.

use chrono::Utc;
use factory_models::WorkerHeartbeat;

use crate::error::StoreResult;
use crate::Store;

impl Store {
    pub async fn upsert_heartbeat(
        &self,
        worker_id: &str,
        role: &str,
        pid: i64,
        hostname: &str,
        detail: &str,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO worker_heartbeats (worker_id, role, pid, hostname, last_seen_at, detail)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(worker_id) DO UPDATE SET
                role = excluded.role, pid = excluded.pid, hostname = excluded.hostname,
                last_seen_at = excluded.last_seen_at, detail = excluded.detail
            "#,
        )
        .bind(worker_id)
        .bind(role)
        .bind(pid)
        .bind(hostname)
        .bind(Utc::now())
        .bind(detail)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_heartbeats(&self) -> StoreResult<Vec<WorkerHeartbeat>> {
        sqlx::query_as("SELECT * FROM worker_heartbeats ORDER BY role, worker_id")
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }
}
