//! Pool creation and SQLite pragmas ("a transactional
//! single-node relational database with write-ahead logging and
//! foreign-key enforcement").

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::StoreResult;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DbConfig {
    pub fn sqlite(path: impl AsRef<str>) -> Self {
        Self {
            url: format!("sqlite:{}?mode=rwc", path.as_ref()),
            max_connections: 5,
        }
    }

    pub fn sqlite_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }
}

pub async fn create_pool(config: DbConfig) -> StoreResult<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await?;

    apply_pragmas(&pool).await?;
    crate::schema::migrate(&pool).await?;

    info!(url = %config.url, "store pool ready");
    Ok(pool)
}

async fn apply_pragmas(pool: &SqlitePool) -> StoreResult<()> {
    sqlx::query("PRAGMA journal_mode=WAL").execute(pool).await?;
    sqlx::query("PRAGMA synchronous=NORMAL").execute(pool).await?;
    sqlx::query("PRAGMA foreign_keys=ON").execute(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_in_memory_pool() {
        let pool = create_pool(DbConfig::sqlite_memory()).await;
        assert!(pool.is_ok());
    }
}
