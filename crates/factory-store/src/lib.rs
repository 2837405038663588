//! Durable single-file relational store and atomic job-claim primitive.
//!
//! All coordination between worker roles happens through this store; no
//! in-process shared memory crosses role boundaries.

pub mod asset_ops;
pub mod channel_ops;
pub mod claim;
pub mod draft_ops;
pub mod error;
pub mod heartbeat;
pub mod job_ops;
pub mod pool;
pub mod schema;
pub mod track_catalog;

pub use error::{StoreError, StoreResult};
pub use job_ops::RetryOutcome;
pub use pool::{create_pool, DbConfig};

use sqlx::SqlitePool;

/// Retention window between `PUBLISHED` and MP4 cleanup. Hard-coded
/// rather than per-channel-configurable.
pub const RETENTION_HOURS: i64 = 48;

/// Handle to the durable store; cheap to clone (wraps a pooled
/// connection set).
#[derive(Debug, Clone)]
pub struct Store {
    pub(crate) pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
