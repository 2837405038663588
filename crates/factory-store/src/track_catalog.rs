//! Track-catalog worker's own small queue.

use chrono::Utc;
use factory_models::TrackCatalogEntry;

use crate::error::StoreResult;
use crate::Store;

impl Store {
    pub async fn upsert_track_catalog_entry(
        &self,
        path: &str,
        normalized_filename: &str,
        duration_sec: Option<f64>,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO track_catalog (path, normalized_filename, duration_sec, discovered_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(path) DO UPDATE SET
                normalized_filename = excluded.normalized_filename,
                duration_sec = excluded.duration_sec
            "#,
        )
        .bind(path)
        .bind(normalized_filename)
        .bind(duration_sec)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn track_catalog_entry(&self, path: &str) -> StoreResult<Option<TrackCatalogEntry>> {
        sqlx::query_as("SELECT * FROM track_catalog WHERE path = ?")
            .bind(path)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    pub async fn list_track_catalog(&self) -> StoreResult<Vec<TrackCatalogEntry>> {
        sqlx::query_as("SELECT * FROM track_catalog ORDER BY path")
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }
}
